//! Scheduler symbol resolution.
//!
//! The inspector needs the addresses of four scheduler globals. They come
//! from the firmware ELF's symbol table, unless the configuration pins them.

use std::collections::BTreeMap;

use memory_addr::{VirtAddr, va};

use crate::config::SymbolOverrides;
use crate::{RtosError, RtosResult};

/// The running task's TCB pointer.
pub const CURRENT_TCB: &str = "pxCurrentTCB";
/// First delayed (blocked) task list.
pub const DELAYED_TASK_LIST1: &str = "xDelayedTaskList1";
/// Second delayed (blocked) task list, used across tick overflow.
pub const DELAYED_TASK_LIST2: &str = "xDelayedTaskList2";
/// Array of per-priority ready lists.
pub const READY_TASKS_LISTS: &str = "pxReadyTasksLists";

/// Addresses of the scheduler globals in target memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KernelSymbols {
    pub current_tcb: VirtAddr,
    pub delayed_lists: [VirtAddr; 2],
    pub ready_lists: VirtAddr,
}

impl KernelSymbols {
    /// Resolves each symbol from the overrides first, then from `table`.
    pub fn resolve(table: Option<&SymbolTable>, overrides: &SymbolOverrides) -> RtosResult<Self> {
        let lookup = |name: &str, pinned: Option<u64>| -> RtosResult<VirtAddr> {
            let addr = pinned
                .or_else(|| table.and_then(|t| t.get(name)))
                .ok_or_else(|| RtosError::Symbol(format!("{name} not found")))?;
            debug!("{} at {:#010x}", name, addr);
            Ok(va!(addr as usize))
        };

        Ok(Self {
            current_tcb: lookup(CURRENT_TCB, overrides.current_tcb)?,
            delayed_lists: [
                lookup(DELAYED_TASK_LIST1, overrides.delayed_task_list1)?,
                lookup(DELAYED_TASK_LIST2, overrides.delayed_task_list2)?,
            ],
            ready_lists: lookup(READY_TASKS_LISTS, overrides.ready_tasks_lists)?,
        })
    }
}

/// Symbol name to address map.
#[derive(Debug, Clone, Default)]
pub struct SymbolTable {
    symbols: BTreeMap<String, u64>,
}

impl SymbolTable {
    pub fn get(&self, name: &str) -> Option<u64> {
        self.symbols.get(name).copied()
    }

    /// Reads `.symtab` of an ELF image.
    #[cfg(feature = "elf")]
    pub fn parse(data: &[u8]) -> RtosResult<Self> {
        use xmas_elf::ElfFile;
        use xmas_elf::sections::SectionData;
        use xmas_elf::symbol_table::Entry;

        fn collect<'a, E: Entry>(
            elf: &ElfFile<'a>,
            entries: &'a [E],
            symbols: &mut BTreeMap<String, u64>,
        ) {
            for entry in entries {
                if let Ok(name) = entry.get_name(elf) {
                    if !name.is_empty() {
                        symbols.entry(name.to_string()).or_insert(entry.value());
                    }
                }
            }
        }

        let elf = ElfFile::new(data).map_err(|e| RtosError::Symbol(e.to_string()))?;
        let section = elf
            .find_section_by_name(".symtab")
            .ok_or_else(|| RtosError::Symbol("no .symtab section, is the ELF stripped?".into()))?;

        let mut symbols = BTreeMap::new();
        match section
            .get_data(&elf)
            .map_err(|e| RtosError::Symbol(e.to_string()))?
        {
            SectionData::SymbolTable32(entries) => collect(&elf, entries, &mut symbols),
            SectionData::SymbolTable64(entries) => collect(&elf, entries, &mut symbols),
            _ => return Err(RtosError::Symbol(".symtab is not a symbol table".into())),
        }

        info!("{} symbols read from ELF", symbols.len());
        Ok(Self { symbols })
    }

    /// Reads the symbol table of the ELF file at `path`.
    #[cfg(feature = "elf")]
    pub fn load(path: &std::path::Path) -> RtosResult<Self> {
        let data = std::fs::read(path)?;
        Self::parse(&data)
    }
}

impl<S: Into<String>> FromIterator<(S, u64)> for SymbolTable {
    fn from_iter<I: IntoIterator<Item = (S, u64)>>(iter: I) -> Self {
        Self {
            symbols: iter.into_iter().map(|(name, addr)| (name.into(), addr)).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> SymbolTable {
        [
            (CURRENT_TCB, 0x2000_0000u64),
            (DELAYED_TASK_LIST1, 0x2000_0010),
            (DELAYED_TASK_LIST2, 0x2000_0030),
            (READY_TASKS_LISTS, 0x2000_0100),
        ]
        .into_iter()
        .collect()
    }

    #[test]
    fn test_resolve_from_table() {
        let symbols = KernelSymbols::resolve(Some(&table()), &SymbolOverrides::default()).unwrap();
        assert_eq!(symbols.current_tcb, va!(0x2000_0000));
        assert_eq!(symbols.delayed_lists, [va!(0x2000_0010), va!(0x2000_0030)]);
        assert_eq!(symbols.ready_lists, va!(0x2000_0100));
    }

    #[test]
    fn test_overrides_win() {
        let overrides = SymbolOverrides {
            current_tcb: Some(0x2000_4000),
            ..Default::default()
        };
        let symbols = KernelSymbols::resolve(Some(&table()), &overrides).unwrap();
        assert_eq!(symbols.current_tcb, va!(0x2000_4000));
        assert_eq!(symbols.ready_lists, va!(0x2000_0100));
    }

    #[test]
    fn test_missing_symbol() {
        let err = KernelSymbols::resolve(None, &SymbolOverrides::default()).unwrap_err();
        assert!(matches!(err, RtosError::Symbol(ref msg) if msg.contains(CURRENT_TCB)));
    }

    #[cfg(feature = "elf")]
    #[test]
    fn test_parse_rejects_garbage() {
        assert!(SymbolTable::parse(b"not an elf").is_err());
    }
}

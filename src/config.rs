//! Configuration.
//!
//! Settings are layered with figment: built-in defaults, then the TOML file
//! (`rtosconfig.toml` unless another path is given), then `RTOS_*`
//! environment variables with `__` separating nested keys, e.g.
//! `RTOS_LAYOUT__TCB_TASK_NUMBER=72`.

pub mod kernel;

use std::path::Path;

use figment::Figment;
use figment::providers::{Env, Format, Serialized, Toml};
use serde::{Deserialize, Serialize};

use crate::drivers::RegisterMap;

/// Byte offsets of the scheduler structures in target memory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct KernelLayout {
    /// `pxTopOfStack` in the TCB.
    pub tcb_top_of_stack: usize,
    /// `uxPriority` in the TCB.
    pub tcb_priority: usize,
    /// `pcTaskName` in the TCB.
    pub tcb_name: usize,
    /// Size of the `pcTaskName` buffer.
    pub task_name_len: usize,
    /// `uxTaskNumber` in the TCB.
    pub tcb_task_number: usize,
    /// `uxNumberOfItems` in a list.
    pub list_count: usize,
    /// `pxIndex` in a list.
    pub list_index: usize,
    /// `xListEnd`, the sentinel node embedded in a list.
    pub list_end: usize,
    /// `sizeof(List_t)`, the stride of `pxReadyTasksLists`.
    pub list_size: usize,
    /// `pxNext` in a list item.
    pub item_next: usize,
    /// `pvOwner` in a list item.
    pub item_owner: usize,
    /// Number of ready lists to walk.
    pub ready_lists: usize,
}

impl Default for KernelLayout {
    fn default() -> Self {
        use kernel::*;
        Self {
            tcb_top_of_stack: TCB_TOP_OF_STACK,
            tcb_priority: TCB_PRIORITY,
            tcb_name: TCB_NAME,
            task_name_len: MAX_TASK_NAME_LEN,
            tcb_task_number: TCB_TASK_NUMBER,
            list_count: LIST_NUMBER_OF_ITEMS,
            list_index: LIST_INDEX,
            list_end: LIST_END,
            list_size: LIST_SIZE,
            item_next: LIST_ITEM_NEXT,
            item_owner: LIST_ITEM_OWNER,
            ready_lists: MAX_PRIORITIES,
        }
    }
}

/// Scheduler symbol addresses that take precedence over the ELF symbol table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SymbolOverrides {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_tcb: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delayed_task_list1: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delayed_task_list2: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ready_tasks_lists: Option<u64>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RemoteConfig {
    /// gdbserver address, `host:port`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    pub registers: RegisterMap,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Whether the core has an FPU (s16..s31 are snapshotted).
    pub fpu: bool,
    pub layout: KernelLayout,
    pub symbols: SymbolOverrides,
    pub remote: RemoteConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            fpu: true,
            layout: KernelLayout::default(),
            symbols: SymbolOverrides::default(),
            remote: RemoteConfig::default(),
        }
    }
}

impl Config {
    fn defaults() -> Figment {
        Figment::from(Serialized::defaults(Config::default()))
    }

    /// Loads the configuration from `path`, or from `rtosconfig.toml` when it
    /// exists, then applies the environment.
    pub fn load(path: Option<&Path>) -> Result<Self, figment::Error> {
        let mut figment = Self::defaults();

        match path {
            Some(path) => {
                info!("loading configuration from {}", path.display());
                figment = figment.merge(Toml::file_exact(path));
            }
            None if Path::new(kernel::DEFAULT_CONFIG_FILE).exists() => {
                info!("loading configuration from {}", kernel::DEFAULT_CONFIG_FILE);
                figment = figment.merge(Toml::file(kernel::DEFAULT_CONFIG_FILE));
            }
            None => debug!("no configuration file, using defaults"),
        }

        figment
            .merge(Env::prefixed(kernel::ENV_PREFIX).split("__"))
            .extract()
    }

    /// Parses a TOML document layered over the defaults.
    pub fn from_toml(toml: &str) -> Result<Self, figment::Error> {
        Self::defaults().merge(Toml::string(toml)).extract()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::from_toml("").unwrap();
        assert_eq!(config, Config::default());
        assert!(config.fpu);
        assert_eq!(config.layout.ready_lists, 7);
        assert_eq!(config.layout.task_name_len, 16);
        assert_eq!(config.symbols.current_tcb, None);
    }

    #[test]
    fn test_toml_overrides() {
        let config = Config::from_toml(
            r#"
            fpu = false

            [layout]
            tcb_task_number = 72
            ready_lists = 5

            [symbols]
            current_tcb = 0x20000100

            [remote]
            address = "localhost:3333"

            [remote.registers]
            psp = 26
            "#,
        )
        .unwrap();

        assert!(!config.fpu);
        assert_eq!(config.layout.tcb_task_number, 72);
        assert_eq!(config.layout.ready_lists, 5);
        assert_eq!(config.layout.tcb_name, kernel::TCB_NAME);
        assert_eq!(config.symbols.current_tcb, Some(0x2000_0100));
        assert_eq!(config.remote.address.as_deref(), Some("localhost:3333"));
        assert_eq!(config.remote.registers.psp, 26);
        assert_eq!(config.remote.registers.xpsr, 16);
    }

    #[test]
    fn test_bad_value_is_reported() {
        assert!(Config::from_toml("[layout]\nlist_size = \"wide\"").is_err());
    }
}

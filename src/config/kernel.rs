//! Scheduler constants for a 32-bit FreeRTOS build.

/// Configuration file looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "rtosconfig.toml";
/// Prefix of configuration environment variables.
pub const ENV_PREFIX: &str = "RTOS_";

pub const MAX_PRIORITIES: usize = 7; // configMAX_PRIORITIES
pub const MAX_TASK_NAME_LEN: usize = 16; // configMAX_TASK_NAME_LEN

// tskTCB, ARM_CM4F, trace facility and stack high address recorded.
pub const TCB_TOP_OF_STACK: usize = 0;
pub const TCB_PRIORITY: usize = 44;
pub const TCB_NAME: usize = 52;
pub const TCB_TASK_NUMBER: usize = 76;

// List_t / ListItem_t.
pub const LIST_NUMBER_OF_ITEMS: usize = 0;
pub const LIST_INDEX: usize = 4;
pub const LIST_END: usize = 8;
pub const LIST_SIZE: usize = 20;
pub const LIST_ITEM_NEXT: usize = 4;
pub const LIST_ITEM_OWNER: usize = 12;

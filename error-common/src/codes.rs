// Error codes
// Stable identifiers logged alongside errors, and the process exit statuses

pub mod validation {
    pub const INVALID_INPUT: &str = "VALIDATION_1001";
    pub const USAGE: &str = "VALIDATION_1002";
    pub const ABORTED: &str = "VALIDATION_1003";
}

pub mod cache {
    pub const UNAVAILABLE: &str = "CACHE_2001";
    pub const CORRUPT_ENTRY: &str = "CACHE_2002";
}

pub mod remote {
    pub const WIPE_FAILED: &str = "REMOTE_3001";
}

pub mod config {
    pub const INVALID: &str = "CONFIG_4001";
    pub const LOGGING: &str = "CONFIG_4002";
}

pub mod system {
    pub const INTERNAL: &str = "SYSTEM_5001";
}

pub mod exit {
    pub const FAILURE: u8 = 1;
    pub const USAGE: u8 = 2;
    pub const CONFIG: u8 = 3;
    pub const REMOTE: u8 = 4;
    pub const ABORTED: u8 = 5;
}

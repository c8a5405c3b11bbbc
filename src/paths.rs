/// Requests the installer expects to be handled, one per line
pub const TODO_LEDGER: &str = "/tmp/dd_todo";

/// Requests this program has finished handling
pub const FINISHED_LEDGER: &str = "/tmp/dd_finished";

/// Created once everything in the to-do ledger is finished
pub const DONE_SENTINEL: &str = "/tmp/dd.done";

/// Names of driver packages the installer should put on the target system
pub const PACKAGE_LEDGER: &str = "/run/install/dd_packages";

/// Saved repositories become DD-1, DD-2, ...
pub const REPO_STAGING_STEM: &str = "/run/install/DD-";

/// Mount points become DD-1, DD-2, ...
pub const MOUNT_STEM: &str = "/media/DD-";

/// Extraction working directory
pub const WORKDIR: &str = "/updates";

/// Live firmware updates directory
pub const FIRMWARE_UPDATES_DIR: &str = "/lib/firmware/updates";

/// Symlinks named after filesystem labels
pub const DISK_LABELS_DIR: &str = "/dev/disk/by-label";

/// System-wide configuration file
pub const CONFIG_FILE: &str = "/etc/driver-updates.toml";

/// Environment variable naming an alternate configuration file
pub const CONFIG_ENV: &str = "DRIVER_UPDATES_CONFIG";

/// Live module updates directory for a kernel release
pub fn module_updates_dir(kernel_release: &str) -> String {
    format!("/lib/modules/{}/updates", kernel_release)
}

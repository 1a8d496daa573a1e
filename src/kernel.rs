//! Guest kernel command line construction.
//!
//! The command line is part of the contract with the guest kernel and image:
//! a fixed base block, then a debug or quiet block, then user parameters.

use crate::config::{HypervisorConfig, Param};
use crate::error::{Error, Result};

/// Parameters every guest boots with. Empty values render as bare flags.
pub const BASE_PARAMS: &[(&str, &str)] = &[
    ("root", "/dev/pmem0p1"),
    ("rootflags", "dax,data=ordered,errors=remount-ro rw"),
    ("rootfstype", "ext4"),
    ("tsc", "reliable"),
    ("no_timer_check", ""),
    ("rcupdate.rcu_expedited", "1"),
    ("i8042.direct", "1"),
    ("i8042.dumbkbd", "1"),
    ("i8042.nopnp", "1"),
    ("i8042.noaux", "1"),
    ("noreplace-smp", ""),
    ("reboot", "k"),
    ("panic", "1"),
    ("console", "hvc0"),
    ("console", "hvc1"),
    ("initcall_debug", ""),
    ("iommu", "off"),
    ("cryptomgr.notests", ""),
    ("net.ifnames", "0"),
    ("pci", "lastbus=0"),
];

/// Parameters added when debug is off.
pub const QUIET_PARAMS: &[(&str, &str)] = &[("quiet", ""), ("systemd.show_status", "false")];

/// Parameters added when debug is on.
pub const DEBUG_PARAMS: &[(&str, &str)] = &[
    ("debug", ""),
    ("systemd.show_status", "true"),
    ("systemd.log_level", "debug"),
];

/// Build the ordered kernel parameter tokens for `config`.
pub fn build_kernel_params(config: &HypervisorConfig) -> Result<Vec<String>> {
    let mode = if config.debug {
        DEBUG_PARAMS
    } else {
        QUIET_PARAMS
    };

    let builtin = BASE_PARAMS.iter().chain(mode).map(render);

    // A value-only user param renders bare; a fully empty one is dropped.
    let user = config
        .kernel_params
        .iter()
        .map(Param::to_string)
        .filter(|token| !token.is_empty());

    let params: Vec<String> = builtin.chain(user).collect();

    if params.is_empty() {
        return Err(Error::kernel_params("no kernel parameters produced"));
    }

    Ok(params)
}

/// Join tokens into the command line passed to `-append`.
pub fn join(params: &[String]) -> String {
    params.join(" ")
}

/// The base block as rendered tokens.
pub fn base_tokens() -> Vec<String> {
    BASE_PARAMS.iter().map(render).collect()
}

/// Check that `params` is a usable command line: non-empty and led by the
/// base block.
pub fn check_params(params: &[String]) -> Result<()> {
    if params.is_empty() {
        return Err(Error::kernel_params("kernel parameter list is empty"));
    }

    let base = base_tokens();
    if !params.starts_with(&base) {
        return Err(Error::kernel_params(
            "kernel parameters do not begin with the base block",
        ));
    }
    Ok(())
}

fn render(&(key, value): &(&str, &str)) -> String {
    Param::new(key, value).to_string()
}

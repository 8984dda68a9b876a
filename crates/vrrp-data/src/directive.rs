//! Maps tokenized configuration directives onto store and builder calls.
//!
//! The tokenizer and block structure live with the caller: it reports the
//! section a directive belongs to, and feeds list blocks
//! (`virtual_ipaddress { ... }` and friends) one line at a time through
//! [`apply_list_item`]. Every error names the offending directive.

use crate::error::{BuildError, Result};
use crate::store::ConfigStore;
use crate::types::{AuthType, ScriptKind, VRRPState};
use std::fmt;
use std::net::IpAddr;
use std::str::FromStr;
use std::time::Duration;

/// Block a directive appears in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Section {
    Root,
    Instance,
    SyncGroup,
}

fn value<'t>(tokens: &[&'t str], keyword: &str) -> Result<&'t str> {
    tokens
        .get(1)
        .copied()
        .ok_or_else(|| BuildError::invalid(keyword, "missing value"))
}

fn parse<T: FromStr>(tokens: &[&str], keyword: &str) -> Result<T>
where
    T::Err: fmt::Display,
{
    let raw = value(tokens, keyword)?;
    raw.parse::<T>()
        .map_err(|e| BuildError::invalid(keyword, format!("{}: {}", raw, e)))
}

fn seconds(tokens: &[&str], keyword: &str, max: u64) -> Result<Duration> {
    let secs: u64 = parse(tokens, keyword)?;
    if secs == 0 || secs > max {
        return Err(BuildError::invalid(
            keyword,
            format!("{} out of range 1..{}", secs, max),
        ));
    }
    Ok(Duration::from_secs(secs))
}

fn script_kind(keyword: &str) -> Option<ScriptKind> {
    match keyword {
        "notify_backup" => Some(ScriptKind::Backup),
        "notify_master" => Some(ScriptKind::Master),
        "notify_fault" => Some(ScriptKind::Fault),
        "notify" => Some(ScriptKind::Generic),
        _ => None,
    }
}

/// Script path plus any arguments, as one command line.
fn command_line(tokens: &[&str], keyword: &str) -> Result<String> {
    value(tokens, keyword)?;
    Ok(tokens[1..].join(" "))
}

fn unknown(keyword: &str, section: Section) -> BuildError {
    BuildError::invalid(keyword, format!("unknown keyword in {:?} section", section))
}

/// Apply one directive line.
pub fn apply(store: &mut ConfigStore, section: Section, tokens: &[&str]) -> Result<()> {
    let Some(&keyword) = tokens.first() else {
        return Ok(());
    };

    match section {
        Section::Root => apply_root(store, keyword, tokens),
        Section::Instance => apply_instance(store, keyword, tokens),
        Section::SyncGroup => apply_sync_group(store, keyword, tokens),
    }
}

fn apply_root(store: &mut ConfigStore, keyword: &str, tokens: &[&str]) -> Result<()> {
    match keyword {
        "vrrp_instance" => {
            store.create_instance(value(tokens, keyword)?)?;
        }
        "vrrp_sync_group" => {
            store.create_sync_group(value(tokens, keyword)?)?;
        }
        _ => return Err(unknown(keyword, Section::Root)),
    }
    Ok(())
}

fn apply_instance(store: &mut ConfigStore, keyword: &str, tokens: &[&str]) -> Result<()> {
    let mut builder = store.current_instance(keyword)?;

    match keyword {
        "state" => {
            let state: VRRPState = parse(tokens, keyword)?;
            if state == VRRPState::Init {
                return Err(BuildError::invalid(keyword, "must be MASTER or BACKUP"));
            }
            builder.set_state(state);
        }
        "interface" => {
            builder.set_interface(value(tokens, keyword)?)?;
        }
        "virtual_router_id" => {
            builder.set_router_id(parse(tokens, keyword)?)?;
        }
        "priority" => {
            builder.set_priority(parse(tokens, keyword)?)?;
        }
        "advert_int" => {
            builder.set_advert_interval(seconds(tokens, keyword, 255)?)?;
        }
        "preempt" => {
            builder.set_preempt(true);
        }
        "nopreempt" => {
            builder.set_preempt(false);
        }
        "auth_type" => {
            let auth_type: AuthType = parse(tokens, keyword)?;
            builder.set_auth_type(auth_type);
        }
        "auth_pass" => {
            builder.set_auth_pass(value(tokens, keyword)?);
        }
        "mcast_src_ip" => {
            let addr: IpAddr = parse(tokens, keyword)?;
            builder.set_mcast_src(addr);
        }
        "lvs_sync_daemon_interface" => {
            builder.set_lvs_sync_interface(value(tokens, keyword)?);
        }
        "garp_master_delay" => {
            builder.set_garp_delay(seconds(tokens, keyword, 3600)?);
        }
        "smtp_alert" => {
            builder.set_smtp_alert(true);
        }
        _ => match script_kind(keyword) {
            Some(kind) => {
                builder.set_script(kind, &command_line(tokens, keyword)?);
            }
            None => return Err(unknown(keyword, Section::Instance)),
        },
    }
    Ok(())
}

fn apply_sync_group(store: &mut ConfigStore, keyword: &str, tokens: &[&str]) -> Result<()> {
    let mut builder = store.current_sync_group(keyword)?;

    match keyword {
        "smtp_alert" => {
            builder.set_smtp_alert(true);
        }
        _ => match script_kind(keyword) {
            Some(kind) => {
                builder.set_script(kind, &command_line(tokens, keyword)?);
            }
            None => return Err(unknown(keyword, Section::SyncGroup)),
        },
    }
    Ok(())
}

/// Apply one line of a list block such as `virtual_ipaddress { ... }`.
pub fn apply_list_item(store: &mut ConfigStore, list: &str, tokens: &[&str]) -> Result<()> {
    if tokens.is_empty() {
        return Ok(());
    }

    match list {
        "track_interface" => {
            store.current_instance(list)?.add_tracked_interface(tokens)?;
        }
        "virtual_ipaddress" => {
            store.current_instance(list)?.add_virtual_ip(tokens)?;
        }
        "virtual_ipaddress_excluded" => {
            store.current_instance(list)?.add_excluded_virtual_ip(tokens)?;
        }
        "virtual_routes" => {
            store.current_instance(list)?.add_virtual_route(tokens)?;
        }
        "group" => {
            let mut builder = store.current_sync_group(list)?;
            for name in tokens {
                builder.add_monitored(name)?;
            }
        }
        "static_ipaddress" => store.add_static_address(tokens)?,
        "static_routes" => store.add_static_route(tokens)?,
        _ => {
            return Err(BuildError::invalid(list, "unknown list block"));
        }
    }
    Ok(())
}

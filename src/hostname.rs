//! Restart order derived from the rack/node addressing embedded in host names.

use std::collections::HashMap;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::{Error, Result};
use crate::model::RoleInstance;

static RACK_NODE: Lazy<Regex> = Lazy::new(|| Regex::new(r"c(\d+)-(\d+)").unwrap());

/// Sort key for a host name such as `worker-c3-14.example.com`.
///
/// Rack and node are zero padded to two digits each and read back as one
/// integer, so `c1-2` gives 102 and `c2-1` gives 201. A rack/node pair
/// whose concatenation does not fit in a `u64` is reported as
/// `InvalidHostname`.
pub fn node_key(hostname: &str) -> Result<u64> {
    let invalid = || Error::InvalidHostname {
        hostname: hostname.to_string(),
    };

    let captures = RACK_NODE.captures(hostname).ok_or_else(invalid)?;
    let rack: u64 = captures[1].parse().map_err(|_| invalid())?;
    let node: u64 = captures[2].parse().map_err(|_| invalid())?;

    format!("{rack:02}{node:02}").parse().map_err(|_| invalid())
}

/// Orders the selected instances by host for a restart run.
///
/// Fails before anything is restarted when a host carries more than one
/// instance or a host name has no rack/node part. Equal keys keep their
/// input order.
pub fn order_by_host(instances: Vec<RoleInstance>) -> Result<Vec<(u64, RoleInstance)>> {
    ensure_one_instance_per_host(&instances)?;

    let mut ordered = instances
        .into_iter()
        .map(|instance| node_key(&instance.hostname).map(|key| (key, instance)))
        .collect::<Result<Vec<_>>>()?;
    ordered.sort_by_key(|(key, _)| *key);

    Ok(ordered)
}

fn ensure_one_instance_per_host(instances: &[RoleInstance]) -> Result<()> {
    let mut by_host: HashMap<&str, Vec<&str>> = HashMap::new();
    for instance in instances {
        by_host
            .entry(instance.hostname.as_str())
            .or_default()
            .push(instance.name.as_str());
    }

    // Report the first offending host in input order.
    for instance in instances {
        let names = &by_host[instance.hostname.as_str()];
        if names.len() > 1 {
            return Err(Error::DuplicateHost {
                hostname: instance.hostname.clone(),
                instances: names.iter().map(|name| name.to_string()).collect(),
            });
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::fixtures::instance;

    #[test]
    fn test_node_key_pads_rack_and_node() {
        assert_eq!(node_key("c1-2").unwrap(), 102);
        assert_eq!(node_key("c1-10").unwrap(), 110);
        assert_eq!(node_key("c2-1").unwrap(), 201);
        assert_eq!(node_key("hadoop-c12-07.dc.example.org").unwrap(), 1207);
    }

    #[test]
    fn test_node_key_orders_by_rack_then_node() {
        let mut hosts = vec!["c2-1", "c1-10", "c1-2", "c10-1", "c3-99"];
        hosts.sort_by_key(|host| node_key(host).unwrap());
        assert_eq!(hosts, vec!["c1-2", "c1-10", "c2-1", "c3-99", "c10-1"]);
    }

    #[test]
    fn test_node_key_wide_node_numbers_are_concatenated() {
        assert_eq!(node_key("c1-100").unwrap(), 1100);
    }

    #[test]
    fn test_node_key_beyond_u64_is_invalid() {
        assert_eq!(node_key("c1844674407-3709551615").unwrap(), 18446744073709551615);
        let err = node_key("c1844674407-3709551616").unwrap_err();
        assert!(matches!(err, Error::InvalidHostname { .. }));
        assert!(node_key("c99999999999999999999-1").is_err());
    }

    #[test]
    fn test_node_key_rejects_hosts_without_rack_node() {
        for host in ["db01.example.com", "", "c-1", "c1_2", "rack1-node2"] {
            let err = node_key(host).unwrap_err();
            assert!(
                matches!(err, Error::InvalidHostname { ref hostname } if hostname == host),
                "{host}: {err}"
            );
        }
    }

    #[test]
    fn test_order_by_host_sorts_ascending() {
        let ordered = order_by_host(vec![
            instance("nm-3", "c2-1"),
            instance("nm-1", "c1-1"),
            instance("nm-2", "c1-2"),
        ])
        .unwrap();

        let names: Vec<&str> = ordered.iter().map(|(_, i)| i.name.as_str()).collect();
        assert_eq!(names, vec!["nm-1", "nm-2", "nm-3"]);
        let keys: Vec<u64> = ordered.iter().map(|(key, _)| *key).collect();
        assert_eq!(keys, vec![101, 102, 201]);
    }

    #[test]
    fn test_order_by_host_is_stable_on_equal_keys() {
        let ordered = order_by_host(vec![
            instance("b", "node-c1-1.a"),
            instance("a", "node-c1-01.b"),
        ])
        .unwrap();
        let names: Vec<&str> = ordered.iter().map(|(_, i)| i.name.as_str()).collect();
        assert_eq!(names, vec!["b", "a"]);
    }

    #[test]
    fn test_order_by_host_fails_on_any_invalid_hostname() {
        let err = order_by_host(vec![instance("nm-1", "c1-1"), instance("nm-2", "gateway")])
            .unwrap_err();
        assert!(matches!(err, Error::InvalidHostname { hostname } if hostname == "gateway"));
    }

    #[test]
    fn test_duplicate_host_is_checked_before_hostnames() {
        let err = order_by_host(vec![
            instance("bad", "gateway"),
            instance("nm-1", "c1-1"),
            instance("nm-2", "c1-1"),
        ])
        .unwrap_err();
        match err {
            Error::DuplicateHost {
                hostname,
                instances,
            } => {
                assert_eq!(hostname, "c1-1");
                assert_eq!(instances, vec!["nm-1", "nm-2"]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}

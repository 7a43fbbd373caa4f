//! IP range property tests: arbitrary input never panics, and every parsed
//! block contains the address it was written with.

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

use iplimit_core::model::IpRange;
use proptest::prelude::*;

proptest! {
    #[test]
    fn parse_never_panics(raw in ".{0,64}") {
        let _ = IpRange::parse(&raw);
        let _ = IpRange::parse_list(&raw);
    }

    #[test]
    fn v4_block_contains_its_base(a in any::<u32>(), prefix in 0u8..=32) {
        let addr = Ipv4Addr::from(a);
        let raw = format!("{addr}/{prefix}");
        let r = IpRange::parse(&raw).unwrap();
        prop_assert!(r.contains(IpAddr::V4(addr)));
        prop_assert_eq!(r.as_str(), raw.as_str());
    }

    #[test]
    fn v6_block_contains_its_base(a in any::<u128>(), prefix in 0u8..=128) {
        let addr = Ipv6Addr::from(a);
        let r = IpRange::parse(&format!("{addr}/{prefix}")).unwrap();
        prop_assert!(r.contains(IpAddr::V6(addr)));
        prop_assert!(!r.contains(IpAddr::V4(Ipv4Addr::LOCALHOST)));
    }

    #[test]
    fn prefix_above_family_max_rejected(a in any::<u32>(), prefix in 33u16..=999) {
        let raw = format!("{}/{prefix}", Ipv4Addr::from(a));
        prop_assert!(IpRange::parse(&raw).is_err());
    }
}

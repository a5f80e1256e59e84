// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for `records.rs`

#[cfg(test)]
mod tests {
    use crate::records::{Action, Change, Instance, LoadBalancer, RecordType, Tag};

    #[test]
    fn test_record_type_round_trips_through_text() {
        for rtype in RecordType::ALL {
            assert_eq!(rtype.as_str().parse::<RecordType>().unwrap(), rtype);
        }
        assert_eq!("cname".parse::<RecordType>().unwrap(), RecordType::CNAME);
        assert!("MX".parse::<RecordType>().is_err());
    }

    #[test]
    fn test_record_type_order_matches_names() {
        let mut by_enum = RecordType::ALL.to_vec();
        by_enum.sort();
        let mut by_name: Vec<&str> = RecordType::ALL.iter().map(|t| t.as_str()).collect();
        by_name.sort_unstable();

        let enum_names: Vec<&str> = by_enum.iter().map(|t| t.as_str()).collect();
        assert_eq!(enum_names, by_name);
    }

    #[test]
    fn test_hickory_record_type_mapping() {
        use hickory_client::rr::RecordType as Hickory;

        assert_eq!(RecordType::A.hickory_record_type(), Hickory::A);
        assert_eq!(RecordType::SRV.hickory_record_type(), Hickory::SRV);
        assert_eq!(RecordType::TXT.hickory_record_type(), Hickory::TXT);
    }

    #[test]
    fn test_delete_sorts_before_create() {
        assert!(Action::Delete < Action::Create);
    }

    #[test]
    fn test_private_name_is_first_label() {
        let instance = Instance {
            id: "i-1".to_string(),
            dns_name: "ec2-1.compute.amazonaws.com.".to_string(),
            private_dns_name: Some("ip-10-0-0-1.ec2.internal".to_string()),
            security_groups: vec![],
            tags: vec![],
        };

        assert_eq!(instance.private_name(), Some("ip-10-0-0-1"));
    }

    #[test]
    fn test_tag_pair_skips_incomplete_tags() {
        assert_eq!(Tag::new("role", "web").pair(), Some(("role", "web")));
        assert_eq!(Tag::new("role", "").pair(), None);
        let missing = Tag {
            key: None,
            value: Some("web".to_string()),
        };
        assert_eq!(missing.pair(), None);
    }

    #[test]
    fn test_load_balancer_prefix() {
        let elb = LoadBalancer {
            dns_name: "api-1234.us-east-1.elb.amazonaws.com".to_string(),
            members: vec!["i-1".to_string()],
        };
        assert_eq!(elb.prefix().as_deref(), Some("api"));
    }

    #[test]
    fn test_change_value_accounting_and_display() {
        let change = Change {
            action: Action::Create,
            name: "web.sg.zs.example.com.".to_string(),
            record_type: RecordType::CNAME,
            ttl: 100,
            values: vec!["i-1.inst.zs.example.com.".to_string()],
            weight: Some(16),
            set_identifier: Some("i-1".to_string()),
            health_check_id: None,
        };

        assert_eq!(change.value_count(), 1);
        assert_eq!(change.value_chars(), "i-1.inst.zs.example.com.".len());
        assert_eq!(
            change.to_string(),
            "CREATE web.sg.zs.example.com. 100 CNAME [i-1.inst.zs.example.com.] set=i-1 weight=16"
        );
    }

    #[test]
    fn test_change_serializes_action_uppercase() {
        let change = Change {
            action: Action::Delete,
            name: "a.".to_string(),
            record_type: RecordType::TXT,
            ttl: 1,
            values: vec![],
            weight: None,
            set_identifier: None,
            health_check_id: None,
        };

        let json = serde_json::to_string(&change).unwrap();
        assert!(json.contains("\"action\":\"DELETE\""));
        assert!(json.contains("\"type\":\"TXT\""));
        assert!(!json.contains("weight"));
    }
}

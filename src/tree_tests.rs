// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for `tree.rs`

#[cfg(test)]
mod tests {
    use crate::records::{RecordType, ResourceRecord, ZoneRecord};
    use crate::tree::{
        merge, normalize, srv_target, tree, zone_tree, Leaf, NormalizeOptions, RecordSet,
        RecordTree,
    };

    fn cname(name: &str, target: &str) -> ResourceRecord {
        ResourceRecord::new(name, RecordType::CNAME, 300, target)
    }

    fn srv(name: &str, target: &str) -> ResourceRecord {
        ResourceRecord::new(name, RecordType::SRV, 100, format!("0 0 0 {target}"))
    }

    fn simple_values(tree: &RecordTree, name: &str, record_type: RecordType) -> Vec<String> {
        tree.get(name, record_type)
            .and_then(RecordSet::simple)
            .map(|leaf| leaf.values.clone())
            .unwrap_or_default()
    }

    /// All permutations of `items` (Heap's algorithm).
    fn permutations<T: Clone>(items: &[T]) -> Vec<Vec<T>> {
        fn generate<T: Clone>(k: usize, items: &mut Vec<T>, out: &mut Vec<Vec<T>>) {
            if k <= 1 {
                out.push(items.clone());
                return;
            }
            for i in 0..k - 1 {
                generate(k - 1, items, out);
                if k % 2 == 0 {
                    items.swap(i, k - 1);
                } else {
                    items.swap(0, k - 1);
                }
            }
            generate(k - 1, items, out);
        }
        let mut items = items.to_vec();
        let mut out = Vec::new();
        let len = items.len();
        generate(len, &mut items, &mut out);
        out
    }

    fn sample_records() -> Vec<ResourceRecord> {
        vec![
            cname("i-1.inst.", "ec2-a.example.net."),
            cname("i-2.inst.", "ec2-b.example.net."),
            srv("_*._*.web.sg.", "i-1.inst."),
            srv("_*._*.web.sg.", "i-2.inst."),
            srv("_*._*.db.sg.", "i-2.inst."),
        ]
    }

    // ========================================================================
    // tree() Tests
    // ========================================================================

    #[test]
    fn test_tree_sorts_and_deduplicates_values() {
        let records = vec![
            srv("_*._*.web.sg.", "i-2.inst."),
            srv("_*._*.web.sg.", "i-1.inst."),
            srv("_*._*.web.sg.", "i-2.inst."),
        ];

        let built = tree(&records);

        assert_eq!(
            simple_values(&built, "_*._*.web.sg.", RecordType::SRV),
            vec!["0 0 0 i-1.inst.", "0 0 0 i-2.inst."]
        );
    }

    #[test]
    fn test_tree_is_order_independent() {
        let records = sample_records();
        let expected = tree(&records);

        for permutation in permutations(&records) {
            assert_eq!(tree(&permutation), expected);
        }
    }

    #[test]
    fn test_tree_conflicting_scalars_are_order_independent() {
        let mut long = srv("_*._*.web.sg.", "i-1.inst.");
        long.ttl = 3600;
        long.health_check_id = Some("hc-b".to_string());
        let mut short = srv("_*._*.web.sg.", "i-2.inst.");
        short.ttl = 60;
        short.health_check_id = Some("hc-a".to_string());
        let records = vec![long, short, srv("_*._*.web.sg.", "i-3.inst.")];
        let expected = tree(&records);

        for permutation in permutations(&records) {
            assert_eq!(tree(&permutation), expected);
        }
        let leaf = expected
            .get("_*._*.web.sg.", RecordType::SRV)
            .and_then(RecordSet::simple)
            .unwrap();
        assert_eq!(leaf.ttl, 60);
        assert_eq!(leaf.health_check_id.as_deref(), Some("hc-a"));
        assert_eq!(leaf.values.len(), 3);
    }

    #[test]
    fn test_tree_keeps_weighted_entries_apart() {
        let mut a = cname("web.", "i-1.inst.");
        a.set_identifier = Some("i-1".to_string());
        a.weight = Some(16);
        let mut b = cname("web.", "i-2.inst.");
        b.set_identifier = Some("i-2".to_string());
        b.weight = Some(16);

        let built = tree(&[a, b]);

        match built.get("web.", RecordType::CNAME) {
            Some(RecordSet::Weighted(entries)) => {
                assert_eq!(entries.len(), 2);
                assert_eq!(entries["i-1"].values, vec!["i-1.inst."]);
                assert_eq!(entries["i-2"].weight, Some(16));
            }
            other => panic!("expected weighted set, got {other:?}"),
        }
        assert_eq!(built.entries().len(), 2);
    }

    #[test]
    fn test_zone_tree_decodes_escaped_names() {
        let records = vec![ZoneRecord {
            name: "_\\052._\\052.web.sg.zs.example.com.".to_string(),
            record_type: RecordType::SRV,
            ttl: 100,
            values: vec!["0 0 0 b.".to_string(), "0 0 0 a.".to_string()],
            weight: None,
            set_identifier: None,
            health_check_id: None,
        }];

        let built = zone_tree(&records);

        assert_eq!(
            simple_values(&built, "_*._*.web.sg.zs.example.com.", RecordType::SRV),
            vec!["0 0 0 a.", "0 0 0 b."]
        );
    }

    // ========================================================================
    // merge() Tests
    // ========================================================================

    #[test]
    fn test_merge_is_left_biased_for_scalars() {
        let left = tree(&[ResourceRecord::new("a.", RecordType::TXT, 60, "x")]);
        let right = tree(&[ResourceRecord::new("a.", RecordType::TXT, 900, "y")]);

        let merged = merge([&left, &right]);

        let leaf = merged
            .get("a.", RecordType::TXT)
            .and_then(RecordSet::simple)
            .unwrap();
        assert_eq!(leaf.ttl, 60);
        assert_eq!(leaf.values, vec!["x", "y"]);
    }

    #[test]
    fn test_merge_keeps_first_shape_on_conflict() {
        let left = tree(&[cname("web.", "a.")]);
        let mut weighted = cname("web.", "b.");
        weighted.set_identifier = Some("b".to_string());
        let right = tree(&[weighted]);

        let merged = merge([&left, &right]);

        assert_eq!(simple_values(&merged, "web.", RecordType::CNAME), vec!["a."]);
    }

    #[test]
    fn test_merge_single_tree_is_identity_on_canonical_tree() {
        let built = tree(&sample_records());
        assert_eq!(merge([&built]), built);
    }

    #[test]
    fn test_leaf_absorb_fills_missing_fields() {
        let mut leaf = Leaf::new(10, vec!["b".to_string()]);
        let other = Leaf {
            ttl: 20,
            values: vec!["a".to_string(), "b".to_string()],
            weight: Some(5),
            health_check_id: Some("hc-1".to_string()),
        };

        leaf.absorb(&other);

        assert_eq!(leaf.ttl, 10);
        assert_eq!(leaf.values, vec!["a", "b"]);
        assert_eq!(leaf.weight, Some(5));
        assert_eq!(leaf.health_check_id.as_deref(), Some("hc-1"));
    }

    // ========================================================================
    // normalize() Tests
    // ========================================================================

    #[test]
    fn test_singleton_srv_is_promoted_to_cname() {
        let input = tree(&[srv("_*._*.svc.", "x.inst.")]);

        let normalized = normalize(&input, NormalizeOptions::default());

        assert_eq!(simple_values(&normalized, "svc.", RecordType::CNAME), vec!["x.inst."]);
        assert_eq!(
            simple_values(&normalized, "_*._*.svc.", RecordType::SRV),
            vec!["0 0 0 x.inst."]
        );
    }

    #[test]
    fn test_multi_value_cname_is_demoted_to_srv() {
        let input = tree(&[cname("svc.", "a.inst."), cname("svc.", "b.inst.")]);

        let normalized = normalize(&input, NormalizeOptions::default());

        assert!(!normalized.contains("svc.", RecordType::CNAME));
        assert_eq!(
            simple_values(&normalized, "_*._*.svc.", RecordType::SRV),
            vec!["0 0 0 a.inst.", "0 0 0 b.inst."]
        );
    }

    #[test]
    fn test_srv_without_prefix_is_not_promoted() {
        let input = tree(&[srv("svc.", "x.inst.")]);

        let normalized = normalize(&input, NormalizeOptions::default());

        assert_eq!(normalized, input);
    }

    #[test]
    fn test_conflicting_cname_and_singleton_srv_converge() {
        let input = tree(&[cname("svc.", "x.inst."), srv("_*._*.svc.", "y.inst.")]);

        let normalized = normalize(&input, NormalizeOptions::default());

        assert!(!normalized.contains("svc.", RecordType::CNAME));
        assert_eq!(
            simple_values(&normalized, "_*._*.svc.", RecordType::SRV),
            vec!["0 0 0 x.inst.", "0 0 0 y.inst."]
        );
    }

    #[test]
    fn test_normalize_is_idempotent() {
        let mut records = sample_records();
        records.push(cname("dup.priv.", "ec2-a.example.net."));
        records.push(cname("dup.priv.", "ec2-b.example.net."));
        records.push(cname("svc.", "x.inst."));
        records.push(srv("_*._*.svc.", "y.inst."));
        let input = tree(&records);

        for options in [
            NormalizeOptions::default(),
            NormalizeOptions {
                weighted_cnames: true,
            },
        ] {
            let once = normalize(&input, options);
            let twice = normalize(&once, options);
            assert_eq!(once, twice);
        }
    }

    #[test]
    fn test_normalize_never_leaves_multi_value_cnames() {
        let mut records = sample_records();
        records.push(cname("dup.priv.", "ec2-a.example.net."));
        records.push(cname("dup.priv.", "ec2-b.example.net."));

        let normalized = normalize(&tree(&records), NormalizeOptions::default());

        for entry in normalized.entries() {
            if entry.record_type == RecordType::CNAME {
                assert!(entry.leaf.values.len() <= 1, "multi-value CNAME at {}", entry.name);
            }
        }
    }

    #[test]
    fn test_normalize_is_order_independent() {
        let records = sample_records();
        let expected = normalize(&tree(&records), NormalizeOptions::default());

        for permutation in permutations(&records) {
            assert_eq!(
                normalize(&tree(&permutation), NormalizeOptions::default()),
                expected
            );
        }
    }

    #[test]
    fn test_weighted_cnames_for_multi_target_srv() {
        let input = tree(&sample_records());

        let normalized = normalize(
            &input,
            NormalizeOptions {
                weighted_cnames: true,
            },
        );

        match normalized.get("web.sg.", RecordType::CNAME) {
            Some(RecordSet::Weighted(entries)) => {
                let ids: Vec<&str> = entries.keys().map(String::as_str).collect();
                assert_eq!(ids, vec!["i-1", "i-2"]);
                assert!(entries.values().all(|leaf| leaf.weight == Some(16)));
                assert_eq!(entries["i-2"].values, vec!["i-2.inst."]);
            }
            other => panic!("expected weighted CNAME set, got {other:?}"),
        }
        // Single-target SRV keeps its plain CNAME
        assert_eq!(simple_values(&normalized, "db.sg.", RecordType::CNAME), vec!["i-2.inst."]);
    }

    #[test]
    fn test_weighted_cnames_disabled_by_default() {
        let normalized = normalize(&tree(&sample_records()), NormalizeOptions::default());
        assert!(!normalized.contains("web.sg.", RecordType::CNAME));
    }

    #[test]
    fn test_srv_target_parsing() {
        assert_eq!(srv_target("0 0 0 a.inst."), Some("a.inst."));
        assert_eq!(srv_target("10 5 443  b.inst."), Some("b.inst."));
        assert_eq!(srv_target("0 0 0"), None);
    }

    // ========================================================================
    // Filtering Tests
    // ========================================================================

    #[test]
    fn test_filters_by_suffix_and_type() {
        let built = tree(&[
            cname("i-1.inst.zs.example.com.", "a."),
            srv("_*._*.web.sg.zs.example.com.", "i-1.inst.zs.example.com."),
            cname("other.example.com.", "b."),
        ]);

        let scoped = built.filter_suffix(".zs.example.com.");
        assert_eq!(scoped.len(), 2);

        let cnames = scoped.filter_types(&[RecordType::CNAME].into_iter().collect());
        assert_eq!(cnames.len(), 1);
        assert!(cnames.contains("i-1.inst.zs.example.com.", RecordType::CNAME));
    }

    #[test]
    fn test_remove_drops_empty_names() {
        let mut built = tree(&[cname("a.", "b.")]);
        assert!(built.remove("a.", RecordType::CNAME).is_some());
        assert!(built.is_empty());
        assert!(built.remove("a.", RecordType::CNAME).is_none());
    }
}

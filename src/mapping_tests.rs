// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for `mapping.rs`

#[cfg(test)]
mod tests {
    use crate::mapping::{canonical_name, mapped_names, rewrite, MappingRule};
    use crate::records::{RecordType, ResourceRecord};
    use crate::tree::{tree, RecordSet};

    fn values(tree: &crate::tree::RecordTree, name: &str, rtype: RecordType) -> Vec<String> {
        tree.get(name, rtype)
            .and_then(RecordSet::simple)
            .map(|leaf| leaf.values.clone())
            .unwrap_or_default()
    }

    #[test]
    fn test_unmatched_name_passes_through() {
        let rules = vec![MappingRule::new("zs.example.com.", &["prod.example.com."])];
        assert_eq!(mapped_names("other.example.org.", &rules), vec!["other.example.org."]);
    }

    #[test]
    fn test_single_rule_multiple_replacements() {
        let rules = vec![MappingRule::new(
            "inst.zs.example.com.",
            &["inst.a.example.com.", "inst.b.example.com."],
        )];

        assert_eq!(
            mapped_names("i-1.inst.zs.example.com.", &rules),
            vec!["i-1.inst.a.example.com.", "i-1.inst.b.example.com."]
        );
        assert_eq!(
            canonical_name("i-1.inst.zs.example.com.", &rules),
            "i-1.inst.a.example.com."
        );
    }

    /// A name matching several rules fans out to the union of every rule's
    /// replacements, in rule order. This accumulation is the current
    /// behavior; first-match-only would drop `sg.b.example.com.` below.
    #[test]
    fn test_multiple_matching_rules_fan_out_to_union() {
        let rules = vec![
            MappingRule::new("sg.zs.example.com.", &["sg.a.example.com."]),
            MappingRule::new("zs.example.com.", &["b.example.com.", "a.example.com."]),
        ];

        assert_eq!(
            mapped_names("web.sg.zs.example.com.", &rules),
            vec![
                "web.sg.a.example.com.",
                "web.sg.b.example.com.",
            ]
        );
    }

    #[test]
    fn test_rewrite_copies_record_sets_and_canonicalizes_srv_targets() {
        let rules = vec![MappingRule::new(
            "zs.example.com.",
            &["a.example.com.", "b.example.com."],
        )];
        let input = tree(&[
            ResourceRecord::new(
                "_*._*.web.sg.zs.example.com.",
                RecordType::SRV,
                100,
                "0 0 0 i-1.inst.zs.example.com.",
            ),
            ResourceRecord::new(
                "i-1.inst.zs.example.com.",
                RecordType::CNAME,
                86_400,
                "ec2-1.example.net.",
            ),
        ]);

        let rewritten = rewrite(&input, &rules);

        for domain in ["a.example.com.", "b.example.com."] {
            assert_eq!(
                values(&rewritten, &format!("_*._*.web.sg.{domain}"), RecordType::SRV),
                vec!["0 0 0 i-1.inst.a.example.com."]
            );
            assert_eq!(
                values(&rewritten, &format!("i-1.inst.{domain}"), RecordType::CNAME),
                vec!["ec2-1.example.net."]
            );
        }
        assert!(!rewritten.contains("i-1.inst.zs.example.com.", RecordType::CNAME));
    }

    #[test]
    fn test_rewrite_merges_colliding_destinations() {
        let rules = vec![
            MappingRule::new("one.example.com.", &["shared.example.com."]),
            MappingRule::new("two.example.com.", &["shared.example.com."]),
        ];
        let input = tree(&[
            ResourceRecord::new("_*._*.web.one.example.com.", RecordType::SRV, 100, "0 0 0 a."),
            ResourceRecord::new("_*._*.web.two.example.com.", RecordType::SRV, 100, "0 0 0 b."),
        ]);

        let rewritten = rewrite(&input, &rules);

        assert_eq!(rewritten.len(), 1);
        assert_eq!(
            values(&rewritten, "_*._*.web.shared.example.com.", RecordType::SRV),
            vec!["0 0 0 a.", "0 0 0 b."]
        );
    }

    #[test]
    fn test_rewrite_without_rules_is_identity() {
        let input = tree(&[ResourceRecord::new("a.", RecordType::TXT, 1, "x")]);
        assert_eq!(rewrite(&input, &[]), input);
    }
}

use std::collections::{HashMap, HashSet};
use std::time::SystemTime;

use mythfs::tree::{Node, TreeBuilder};
use mythfs::Record;
use proptest::prelude::*;

use crate::support::base_time;

fn title() -> impl Strategy<Value = String> {
    prop::sample::select(vec![
        "News", "News (1)", "News (2)", "Movie: Part 1", "a/b", "", "..", "What?",
    ])
    .prop_map(str::to_string)
}

fn records() -> impl Strategy<Value = Vec<Record>> {
    prop::collection::vec((title(), title(), 0u64..4096), 0..40).prop_map(|fields| {
        fields
            .into_iter()
            .enumerate()
            .map(|(i, (title, subtitle, size))| {
                Record::new(i.to_string(), size, base_time(), base_time())
                    .with_title(title)
                    .with_subtitle(subtitle)
            })
            .collect()
    })
}

fn layout(records: &[Record]) -> Vec<(String, Option<String>)> {
    let tree = TreeBuilder::default().build(records.to_vec(), SystemTime::UNIX_EPOCH);
    tree.walk()
        .into_iter()
        .map(|(path, node)| (path, node.as_file().map(|f| f.record().id.clone())))
        .collect()
}

proptest! {
    #[test]
    fn sibling_names_are_unique(records in records()) {
        let tree = TreeBuilder::default().build(records, SystemTime::UNIX_EPOCH);
        let paths: Vec<String> = tree.walk().into_iter().map(|(path, _)| path).collect();
        let distinct: HashSet<&String> = paths.iter().collect();
        prop_assert_eq!(distinct.len(), paths.len());
    }

    #[test]
    fn every_record_appears_once(records in records()) {
        let tree = TreeBuilder::default().build(records.clone(), SystemTime::UNIX_EPOCH);
        let mut seen: HashMap<String, usize> = HashMap::new();
        for (_, file) in tree.files() {
            *seen.entry(file.record().id.clone()).or_default() += 1;
        }
        prop_assert_eq!(seen.len(), records.len());
        prop_assert!(seen.values().all(|&count| count == 1));
        prop_assert_eq!(tree.file_count(), records.len());
        prop_assert_eq!(tree.total_bytes(), records.iter().map(|r| r.size).sum::<u64>());
    }

    #[test]
    fn same_order_builds_same_tree(records in records()) {
        prop_assert_eq!(layout(&records), layout(&records));
    }

    #[test]
    fn every_path_resolves_to_its_node(records in records()) {
        let tree = TreeBuilder::default().build(records, SystemTime::UNIX_EPOCH);
        for (path, node) in tree.walk() {
            let resolved = tree.resolve(&path).unwrap();
            prop_assert_eq!(resolved.name(), node.name());
            match (resolved, node) {
                (Node::File(a), Node::File(b)) => prop_assert_eq!(&a.record().id, &b.record().id),
                (Node::Directory(a), Node::Directory(b)) => prop_assert_eq!(a.len(), b.len()),
                _ => prop_assert!(false, "kind mismatch at {}", path),
            }
        }
    }
}

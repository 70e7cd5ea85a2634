use std::collections::{HashMap, HashSet, VecDeque};
use std::hash::Hash;

use anyhow::{Context, Result};
use cargo_metadata::MetadataCommand;

/// Package -> crates it must never reach, directly or transitively.
const RULES: &[(&str, &[&str])] = &[
    (
        "survey-contracts",
        &["axum", "sqlx", "tokio", "survey-store", "survey-service"],
    ),
    (
        "survey-policy",
        &["axum", "sqlx", "tokio", "survey-store", "survey-service"],
    ),
    ("survey-service", &["axum", "survey-gateway"]),
    ("survey-store", &["axum", "survey-service", "survey-gateway"]),
];

fn reachable<K>(root: &K, adjacency: &HashMap<K, Vec<K>>) -> HashSet<K>
where
    K: Clone + Eq + Hash,
{
    let mut visited = HashSet::new();
    let mut queue = VecDeque::new();
    queue.push_back(root.clone());

    while let Some(current) = queue.pop_front() {
        let Some(deps) = adjacency.get(&current) else {
            continue;
        };

        for dep in deps {
            if visited.insert(dep.clone()) {
                queue.push_back(dep.clone());
            }
        }
    }

    visited
}

fn main() -> Result<()> {
    let metadata = MetadataCommand::new()
        .exec()
        .context("failed to run `cargo metadata`")?;

    let resolve = metadata
        .resolve
        .as_ref()
        .context("`cargo metadata` did not include a resolved dependency graph")?;

    let id_to_name: HashMap<_, _> = metadata
        .packages
        .iter()
        .map(|p| (p.id.clone(), p.name.as_str()))
        .collect();

    let adjacency: HashMap<_, _> = resolve
        .nodes
        .iter()
        .map(|node| {
            let deps: Vec<_> = node.deps.iter().map(|dep| dep.pkg.clone()).collect();
            (node.id.clone(), deps)
        })
        .collect();

    let mut failed = false;
    for (package_name, forbidden) in RULES {
        let package = metadata
            .packages
            .iter()
            .find(|p| p.name.as_str() == *package_name)
            .with_context(|| format!("package `{}` not found in workspace", package_name))?;

        let mut violations = reachable(&package.id, &adjacency)
            .iter()
            .filter_map(|id| id_to_name.get(id).copied())
            .filter(|name| forbidden.contains(name))
            .map(str::to_string)
            .collect::<Vec<_>>();

        if violations.is_empty() {
            println!(
                "OK: `{}` has no dependency edge to {}",
                package_name,
                forbidden.join(", ")
            );
            continue;
        }

        violations.sort();
        violations.dedup();
        eprintln!(
            "FAIL: `{}` depends on forbidden crate(s): {}",
            package_name,
            violations.join(", ")
        );
        failed = true;
    }

    if failed {
        std::process::exit(1);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reachable_follows_transitive_edges_and_cycles() {
        let adjacency = HashMap::from([
            ("policy", vec!["contracts", "chrono"]),
            ("contracts", vec!["serde", "chrono"]),
            ("serde", vec!["serde_derive"]),
            ("chrono", vec!["contracts"]),
            ("store", vec!["sqlx"]),
        ]);

        let seen = reachable(&"policy", &adjacency);
        assert!(seen.contains("serde_derive"));
        assert!(seen.contains("contracts"));
        assert!(!seen.contains("sqlx"));
    }

    #[test]
    fn pure_crates_forbid_io_crates() {
        for pure in ["survey-contracts", "survey-policy"] {
            let (_, forbidden) = RULES
                .iter()
                .find(|(name, _)| *name == pure)
                .expect("rule should exist");
            for io in ["axum", "sqlx", "tokio"] {
                assert!(forbidden.contains(&io), "{pure} must forbid {io}");
            }
        }
    }
}

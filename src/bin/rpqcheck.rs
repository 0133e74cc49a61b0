//! Command-line driver for one-off checks and measures runs.
//!
//! Usage:
//!   rpqcheck --graph <graph.json> --check "<name = lhs ⊆ rhs>"
//!   rpqcheck --graph <graph.json> --measures <bundle.json> [--select m1,m2,…]
//!
//! The graph file is a `GraphDoc` (`{"nodes": […], "edges": […]}`); the
//! bundle file is `{"constraints": ["C1 = …", …]}`. Results print to
//! stdout as pretty JSON, diagnostics to stderr.

#![forbid(unsafe_code)]

use std::str::FromStr;
use std::{env, fs};

use rpqcheck::store::ConstraintBundle;
use rpqcheck::{check_inclusion, compute_measures, MeasureName, MemoryGraph};

const USAGE: &str = "usage: rpqcheck --graph <graph.json> \
                     (--check \"<rpc>\" | --measures <bundle.json> [--select m1,m2,...])";

fn parse_flag(args: &[String], key: &str) -> Option<String> {
    let mut it = args.iter();
    while let Some(a) = it.next() {
        if a == key {
            return it.next().cloned();
        }
    }
    None
}

fn main() -> anyhow::Result<()> {
    let args: Vec<String> = env::args().collect();

    let graph_path = parse_flag(&args, "--graph")
        .ok_or_else(|| anyhow::anyhow!("--graph is required\n{USAGE}"))?;
    let text = fs::read_to_string(&graph_path)
        .map_err(|e| anyhow::anyhow!("read graph {graph_path}: {e}"))?;
    let graph = MemoryGraph::from_json(&text)
        .map_err(|e| anyhow::anyhow!("parse graph {graph_path}: {e}"))?;
    eprintln!(
        "loaded graph: {} nodes, {} edges",
        graph.node_count(),
        graph.edge_count()
    );

    if let Some(raw) = parse_flag(&args, "--check") {
        let report = check_inclusion(&graph, &raw)?;
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    if let Some(bundle_path) = parse_flag(&args, "--measures") {
        let bundle_text = fs::read_to_string(&bundle_path)
            .map_err(|e| anyhow::anyhow!("read bundle {bundle_path}: {e}"))?;
        let bundle: ConstraintBundle = serde_json::from_str(&bundle_text)
            .map_err(|e| anyhow::anyhow!("parse bundle {bundle_path}: {e}"))?;

        let requested = match parse_flag(&args, "--select") {
            None => MeasureName::ALL.to_vec(),
            Some(csv) => csv
                .split(',')
                .map(|s| MeasureName::from_str(s.trim()).map_err(anyhow::Error::msg))
                .collect::<anyhow::Result<Vec<_>>>()?,
        };

        eprintln!(
            "computing {} measure(s) over {} constraint(s)",
            requested.len(),
            bundle.constraints.len()
        );
        let outcome = compute_measures(&graph, &bundle.constraints, &requested)?;
        println!("{}", serde_json::to_string_pretty(&outcome)?);
        return Ok(());
    }

    anyhow::bail!("nothing to do\n{USAGE}")
}

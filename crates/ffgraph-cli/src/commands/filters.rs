//! Operation kind listing command.

#![allow(clippy::print_literal)] // Table headers use literal strings

use anyhow::anyhow;
use clap::Args;
use ffgraph_config::{FilterCategory, FilterDescriptor, FilterRegistry};

#[derive(Args)]
pub struct FiltersArgs {
    /// Show parameters for a specific operation kind
    #[arg(value_name = "FILTER")]
    filter: Option<String>,
}

pub fn run(args: FiltersArgs) -> anyhow::Result<()> {
    let registry = FilterRegistry::new();

    if let Some(id) = &args.filter {
        let descriptor = registry
            .find(id)
            .ok_or_else(|| anyhow!("Unknown filter: {id}"))?;
        print_details(descriptor);
        return Ok(());
    }

    println!("Available Filters");
    println!("=================");
    for category in [
        FilterCategory::Video,
        FilterCategory::Audio,
        FilterCategory::Composite,
    ] {
        println!();
        println!("{}:", category.name());
        for descriptor in registry.filters_in_category(category) {
            let gate = if descriptor.timeline { " [timeline]" } else { "" };
            println!("  {:15} - {}{gate}", descriptor.id, descriptor.description);
            for param in descriptor.params {
                println!(
                    "      {:14} {:16} {}",
                    param.name,
                    param.default.unwrap_or("(required)"),
                    param.description
                );
            }
        }
    }
    println!();
    println!("Use 'ffgraph filters <name>' for a single filter.");
    Ok(())
}

fn print_details(descriptor: &FilterDescriptor) {
    println!("{}", descriptor.id);
    println!("{}", "=".repeat(descriptor.id.len()));
    println!();
    println!("{}", descriptor.description);
    println!(
        "Category: {}{}",
        descriptor.category.name(),
        if descriptor.timeline {
            ", accepts since/until/enable"
        } else {
            ""
        }
    );
    println!();

    if descriptor.params.is_empty() {
        println!("No parameters.");
        return;
    }
    println!("  {:14}  {:16}  {}", "Name", "Default", "Description");
    println!("  {:14}  {:16}  {}", "----", "-------", "-----------");
    for param in descriptor.params {
        println!(
            "  {:14}  {:16}  {}",
            param.name,
            param.default.unwrap_or("(required)"),
            param.description
        );
    }
}

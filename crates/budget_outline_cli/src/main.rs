//! CLI smoke entry point.
//!
//! # Responsibility
//! - Verify `budget_outline_core` linkage without any UI or store.
//! - Print a deterministic normalized demo outline for quick sanity checks.
//! - Write the engine's debug events under the system temp directory.

use budget_outline_core::{default_log_level, init_logging, MoveDirection, NodeKind, StagingBuffer};

fn main() {
    println!("budget_outline_core ping={}", budget_outline_core::ping());
    println!(
        "budget_outline_core version={}",
        budget_outline_core::core_version()
    );

    let log_dir = std::env::temp_dir().join("budget_outline_cli");
    match init_logging(default_log_level(), &log_dir.to_string_lossy()) {
        Ok(()) => println!("budget_outline_core logs={}", log_dir.display()),
        Err(err) => eprintln!("budget_outline_core logging disabled: {err}"),
    }

    let mut buffer = StagingBuffer::new();
    let works = buffer.add_node(None, 0.0, NodeKind::Section, "Obras provisionales");
    let sign = buffer.add_node(Some(works), 0.5, NodeKind::LineItem, "Cartel de obra");
    let earthworks = buffer.add_node(None, 1.0, NodeKind::Section, "Movimiento de tierras");
    buffer.add_node(Some(earthworks), 1.5, NodeKind::LineItem, "Excavación masiva");
    buffer.move_adjacent(sign, MoveDirection::Down);
    buffer.normalize();

    for node in buffer.nodes() {
        let indent = "  ".repeat(node.level.saturating_sub(1) as usize);
        println!("{indent}{} {:?} {}", node.code_text(), node.kind, node.label);
    }
}

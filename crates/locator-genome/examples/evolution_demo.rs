//! Evolution Demo - Watching a Button Survive a Redesign
//!
//! Captures the same checkout button across three releases of a page and
//! prints the mutations detected and the selector ranking after each one.
//!
//! # Running
//!
//! ```bash
//! cargo run --example evolution_demo -p locator-genome
//! ```

#![allow(clippy::uninlined_format_args, clippy::unwrap_used)]

use locator_genome::prelude::*;

#[tokio::main]
async fn main() -> GenomeResult<()> {
    println!("=== Locator Genome Evolution Demo ===\n");

    let dir = tempfile::tempdir()?;
    let config = TrackerConfig::default().with_knowledge_path(dir.path().join("knowledge.json"));
    let clock = FakeClock::shared(1_700_000_000_000);
    let tracker = EvolutionTracker::with_clock(config, clock.clone())?;
    let source = MockElementSource::new();

    let v1 = RawElementSnapshot::new("button", "html > body > main > form > button")
        .with_id("checkout")
        .with_classes(["btn", "btn-primary"])
        .with_aria("label", "Checkout")
        .with_text("Checkout")
        .with_domain("shop.example")
        .at(1, 4);
    source.set_element("#checkout", v1.clone());
    let first = tracker.capture(&source, "#checkout").await?;
    report(&tracker, "Release 1", &first.tracking_id);

    // Release 2: styled-components rewrite of the class list
    clock.advance_days(14);
    let v2 = v1.clone().with_classes(["sc-a1b2c3", "btn-primary"]);
    tracker.capture_tracked(first.tracking_id.clone(), "#checkout", v2.clone());
    report(&tracker, "Release 2", &first.tracking_id);

    // Release 3: id dropped, form wrapped in a new layout container
    clock.advance_days(30);
    let mut v3 = v2.at(1, 6).with_text("Go to checkout");
    v3.attributes.id = None;
    v3.position.path = "html > body > main > div > section > form > button".to_string();
    tracker.capture_tracked(first.tracking_id.clone(), "#checkout", v3);
    report(&tracker, "Release 3", &first.tracking_id);

    let stats = tracker.statistics();
    println!(
        "Tracked {} element(s), {} mutation(s), mean stability {:.3}",
        stats.tracked_elements, stats.total_mutations, stats.mean_stability
    );
    tracker.dispose()?;

    println!("\n=== Evolution Demo Complete ===");
    Ok(())
}

fn report(tracker: &EvolutionTracker, label: &str, tracking_id: &str) {
    println!("--- {label} ---");
    let history = tracker.history(tracking_id).unwrap();
    let new_mutations = history
        .mutations
        .iter()
        .filter(|m| m.timestamp == history.last_seen);
    for m in new_mutations {
        println!(
            "  mutation {:<20} {:?} -> {:?}",
            m.mutation_type.to_string(),
            m.before,
            m.after
        );
    }
    for ranked in tracker.ranked_selectors(tracking_id).unwrap().iter().take(4) {
        println!(
            "  {:<45} survival {:.3}  score {:.3}  {}",
            ranked.selector, ranked.survival_probability, ranked.score, ranked.trend
        );
    }
    println!();
}

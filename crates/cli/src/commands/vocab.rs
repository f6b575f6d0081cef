//! `resgenie vocab`: Print the vocabulary the resolver matches against.

use resgenie_resolver::vocabulary::{CANONICAL_SKILLS, RANK_LEVELS, REGIONS, TOP_RANK};

pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    print!("{}", listing());
    Ok(())
}

fn listing() -> String {
    let mut out = String::new();

    out.push_str("🌍 Regions\n");
    for (region, cities) in REGIONS {
        out.push_str(&format!("  {region:<10} {}\n", cities.join(", ")));
    }

    out.push_str("\n🏛  Rank hierarchy (highest first)\n");
    for (level, ranks) in RANK_LEVELS.iter().enumerate() {
        out.push_str(&format!("  {:>2}. {}\n", level + 1, ranks.join(" = ")));
    }
    out.push_str(&format!(
        "  Searches for {TOP_RANK} with no local match are broadened to all locations.\n"
    ));

    out.push_str("\n🛠  Skills\n");
    for skill in CANONICAL_SKILLS {
        out.push_str(&format!("  {skill}\n"));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn listing_covers_every_table() {
        let text = listing();
        assert!(text.contains("Nordics"));
        assert!(text.contains("Associate Partner = Consulting Director"));
        assert!(text.contains("Scrum Master"));
        assert!(text.contains(" 1. Partner"));
    }
}

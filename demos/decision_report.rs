use tagward::{RoleSet, TagConfigurationBuilder, TagSet};

fn main() {
    let config = TagConfigurationBuilder::new()
        .tag("spam", |t| t.forbidden())
        .tag("locked", |t| t.add_requires(["moderator"]))
        .tag("event", |t| t.needs_group("seasons"))
        .group("seasons", |g| {
            g.members(["spring", "summer", "autumn", "winter"]).exclusive()
        })
        .group("colors", |g| g.members(["red", "blue", "green"]).at_most(2))
        .compile()
        .expect("failed to compile tag configuration");

    // A change that trips all three kinds of failure at once.
    let previous = TagSet::parse_line("red").unwrap();
    let current = TagSet::parse_line("red blue green spam event summer winter").unwrap();

    let decision = config.validate(&previous, &current, &RoleSet::new());

    println!("{decision}");
    println!();
    println!("valid: {}", decision.is_valid());
    println!("rejected tags: {}", decision.invalid_tags());
    println!("unmet tag conditions: {}", decision.failed_tag_conditions());
    for violation in decision.failed_tag_group_conditions() {
        println!("group violation: {violation}");
    }
}

use tagward::{role_set, TagConfigurationBuilder, TagSet};

fn main() {
    // Define the site's tagging policy
    let config = TagConfigurationBuilder::new()
        .tag("spam", |t| t.forbidden())
        .tag("locked", |t| t.add_requires(["moderator"]))
        .group("colors", |g| g.members(["red", "blue", "green"]).exclusive())
        .compile()
        .expect("failed to compile tag configuration");

    println!("{config}");

    // Validate a proposed tag change
    let previous = TagSet::parse_line("red scp").unwrap();
    let current = TagSet::parse_line("red blue scp locked").unwrap();
    let roles = role_set(["moderator"]);

    let decision = config.validate(&previous, &current, &roles);
    println!("Decision: {decision}");
}

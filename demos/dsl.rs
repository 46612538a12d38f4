use tagward::{RoleSet, TagConfiguration, TagSet};

fn main() {
    let config =
        TagConfiguration::from_file("demos/policy.tagward").expect("failed to load policy");

    println!("{config}");

    let previous = TagSet::parse_line("red").unwrap();
    let current = TagSet::parse_line("red blue event").unwrap();

    let decision = config.validate(&previous, &current, &RoleSet::new());
    println!("Decision: {decision}");
}

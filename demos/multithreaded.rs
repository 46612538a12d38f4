use std::sync::Arc;
use std::thread;

use tagward::{role_set, TagConfigurationBuilder, TagSet};

fn main() {
    let config = Arc::new(
        TagConfigurationBuilder::new()
            .tag("locked", |t| t.add_requires(["moderator"]))
            .tag("spam", |t| t.forbidden())
            .compile()
            .expect("failed to compile tag configuration"),
    );

    let handles: Vec<_> = (0..4)
        .map(|i| {
            let cfg = Arc::clone(&config);
            thread::spawn(move || {
                let previous = TagSet::new();
                let current = TagSet::parse_line(if i % 2 == 0 { "locked" } else { "spam" })
                    .unwrap();
                let roles = if i < 2 {
                    role_set(["moderator"])
                } else {
                    role_set(Vec::<&str>::new())
                };

                let decision = cfg.validate(&previous, &current, &roles);
                println!("Thread {i}: {decision}");
            })
        })
        .collect();

    for h in handles {
        h.join().unwrap();
    }
}

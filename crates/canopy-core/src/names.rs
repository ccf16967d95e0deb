//! Random worktree names and spawn batch naming.

use rand::seq::SliceRandom;

const ADJECTIVES: &[&str] = &[
    "brave", "swift", "calm", "bold", "keen", "wild", "warm", "cool", "fair", "wise",
];

const NOUNS: &[&str] = &[
    "panda", "falcon", "river", "mountain", "oak", "wolf", "hawk", "cedar", "fox", "bear",
];

/// A random `<adjective>-<noun>` pair.
pub fn random_name() -> String {
    let mut rng = rand::thread_rng();
    let adj = ADJECTIVES.choose(&mut rng).unwrap_or(&"brave");
    let noun = NOUNS.choose(&mut rng).unwrap_or(&"panda");
    format!("{adj}-{noun}")
}

/// Names for a spawn batch of `n`, 1-based index prefix for ordering.
///
/// With a prefix every slot is `<index>-<prefix>`; otherwise each slot draws
/// a random pair unique within the batch, giving up after 100 tries on the
/// deterministic `spawn-<index>` fallback.
pub fn spawn_names(n: usize, prefix: Option<&str>) -> Vec<String> {
    let mut names = Vec::with_capacity(n);
    let mut used = Vec::new();

    for i in 0..n {
        let idx = i + 1;
        let name = match prefix {
            Some(p) => format!("{idx}-{p}"),
            None => {
                let mut part = format!("spawn-{idx}");
                for _ in 0..100 {
                    let candidate = random_name();
                    if !used.contains(&candidate) {
                        part = candidate;
                        break;
                    }
                }
                used.push(part.clone());
                format!("{idx}-{part}")
            }
        };
        names.push(name);
    }

    names
}

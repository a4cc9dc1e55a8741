//! Removes the transaction, preference and version documents from the data
//! directory, leaving categories and budgets in place.

use finance_tracker::{
    init,
    storage::{keys, JsonFileBackend, KeyValueBackend},
    utils::paths,
};
use tracing::warn;

fn main() {
    init();

    let backend = JsonFileBackend::new(paths::store_dir());
    let mut failed = false;
    for key in keys::LEGACY_KEYS {
        let exists = backend
            .key_path(key)
            .map(|path| path.exists())
            .unwrap_or(false);
        if !exists {
            println!("{key} not found");
            continue;
        }
        match backend.delete(key) {
            Ok(()) => println!("removed {key}"),
            Err(err) => {
                warn!(key, error = %err, "could not remove key");
                eprintln!("Error: could not remove {key}: {err}");
                failed = true;
            }
        }
    }
    if failed {
        std::process::exit(1);
    }
}

use std::collections::HashSet;

use crate::{
    model::fs::{EmulatedDir, ListingEntry},
    util::path,
};

/// Appends a directory entry for every ancestor implied by a key in
/// `listing` that was not itself listed as a directory marker.
pub fn emulate_directories(listing: Vec<ListingEntry>) -> Vec<ListingEntry> {
    let mut discovered: Vec<String> = Vec::new();
    let mut seen: HashSet<String> = HashSet::new();
    let mut explicit: HashSet<String> = HashSet::new();

    for entry in &listing {
        if entry.is_dir() {
            explicit.insert(entry.path().to_string());
        }

        let mut ancestor = entry.dirname();
        while !ancestor.is_empty() && !seen.contains(ancestor) {
            seen.insert(ancestor.to_string());
            discovered.push(ancestor.to_string());
            ancestor = path::dirname(ancestor);
        }
    }

    let synthesized = discovered
        .into_iter()
        .filter(|dir| !explicit.contains(dir))
        .map(|dir| ListingEntry::Emulated(emulated_dir(dir)))
        .collect::<Vec<_>>();

    let mut listing = listing;
    listing.extend(synthesized);
    listing
}

fn emulated_dir(path: String) -> EmulatedDir {
    let basename = path::basename(&path).to_string();
    EmulatedDir {
        dirname: path::dirname(&path).to_string(),
        filename: basename.clone(),
        basename,
        path,
    }
}

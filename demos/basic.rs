use freqrank::FrequencyIndex;

fn main() {
    // Default sizing: a 1031-slot hash table and a 1024-entry ranking array.
    // Both grow on demand up to 10 million slots.
    let mut index = FrequencyIndex::new().expect("default capacities are within limits");

    // Record some occurrences; the amount may be more than one.
    index.record("frequent item", 5).unwrap();
    index.record("less frequent item", 3).unwrap();
    index.record("rare item", 1).unwrap();
    index.record("frequent item", 2).unwrap();

    // Print the items and their counts in order of frequency
    println!("Top items and their frequencies:");
    for (item, count) in index.top(10) {
        println!("{}: {}", item, count);
    }

    // Exact lookups
    let item = "frequent item";
    println!("\nCount for '{}': {}", item, index.count(item));
    println!("Count for 'missing': {}", index.count("missing"));

    // Rank queries
    println!("Second most frequent: {}", index.nth_most_frequent(1).unwrap());
    match index.nth_most_frequent(99) {
        Ok(item) => println!("Rank 99: {}", item),
        Err(err) => println!("Rank 99: {}", err),
    }
}

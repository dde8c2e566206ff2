use std::collections::hash_map::DefaultHasher;
use std::hash::BuildHasher;
use std::hash::Hash;
use std::hash::Hasher;

use clap::Parser;
use clap::ValueEnum;
use prime_chain::HashTable;
use prime_chain::ScalarState;
use prime_chain::city::city_hash64;
use prime_chain::crc::crc32;
use prime_chain::hash_table::Entry;
use prime_chain::murmur3::murmur3_x86_32;

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Family {
    Scalar,
    Sip,
    City,
    Murmur3,
    Crc32,
}

#[derive(Parser, Debug)]
struct Args {
    #[arg(short = 'n', long = "values", default_value_t = 1000)]
    values: usize,

    #[arg(short = 'l', long = "max_load_factor", default_value_t = 1.0)]
    max_load_factor: f32,

    #[arg(short = 'f', long = "family", value_enum, default_value_t = Family::Scalar)]
    family: Family,

    /// Spacing between consecutive keys.
    #[arg(short = 's', long = "stride", default_value_t = 1)]
    stride: u64,
}

fn hash_u64(family: Family, value: u64) -> u64 {
    let bytes = value.to_le_bytes();
    match family {
        Family::Scalar => ScalarState.hash_one(value),
        Family::Sip => {
            let mut hasher = DefaultHasher::new();
            value.hash(&mut hasher);
            hasher.finish()
        }
        Family::City => city_hash64(&bytes),
        Family::Murmur3 => murmur3_x86_32(&bytes, 0) as u64,
        Family::Crc32 => crc32(&bytes, 0) as u64,
    }
}

fn main() {
    let args = Args::parse();

    let mut table: HashTable<u64> = HashTable::new();
    if let Err(err) = table.set_max_load_factor(args.max_load_factor) {
        eprintln!("Failed to set max load factor: {err}");
        return;
    }

    println!(
        "Inserting {} keys with stride {} hashed by {:?}",
        args.values, args.stride, args.family
    );

    for i in 0..args.values as u64 {
        let value = i.wrapping_mul(args.stride);
        let hash = hash_u64(args.family, value);

        match table.entry(hash, |&v| v == value) {
            Ok(Entry::Vacant(entry)) => {
                entry.insert(value);
            }
            Ok(Entry::Occupied(_)) => {
                panic!("Value already exists in table: {}", value);
            }
            Err(err) => {
                eprintln!("Insert of {} failed: {err}", value);
                break;
            }
        }
    }

    println!(
        "Inserted {} values into {} buckets",
        table.len(),
        table.bucket_count()
    );

    table.print_chain_histogram();
    table.debug_stats().print();
}

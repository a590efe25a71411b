use std::collections::HashSet;
use std::fs;

use rs_names_core::io;
use rs_names_core::model::chain_builder::ChainBuilder;
use rs_names_core::model::compiled_chain::CompiledChain;
use rs_names_core::model::termination::{LengthCurve, TerminationPolicy};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load the name corpus (a JSON array of strings)
    let names = io::read_names("./datasets/all_names.json")?;

    // The sentinels are reserved: they must not occur anywhere in the corpus
    let char_set: HashSet<char> = names.iter().flat_map(|name| name.chars()).collect();
    assert!(!char_set.contains(&'^'));
    assert!(!char_set.contains(&'$'));

    // Build one chain per order, with nested back-off enabled so that
    // contexts rarely seen at full length can fall back to shorter ones.
    // 'from_corpus_file' ingests the corpus on parallel chunks and keeps a
    // binary cache next to it, so repeated runs load instantly
    fs::create_dir_all("./chains")?;
    for seq_len in 1..=5 {
        let builder = ChainBuilder::from_corpus_file(
            "./datasets/all_names.json", '^', '$', seq_len, true,
        )?;
        println!("seq_len {}: {} contexts", seq_len, builder.state_count());

        // Compiling is a pure snapshot; the JSON file is the wire format
        // consumed by the server
        let chain = builder.compile();
        io::write_json(format!("./chains/chain_seq_len_{}.json", seq_len), &chain)?;
    }

    // Reload each chain from its JSON file and measure how often it
    // reproduces a name that already exists in the corpus
    let name_set: HashSet<String> = names.into_iter().collect();
    let gen_count = 10_000;
    let mut rng = rand::rng();
    for seq_len in 1..=5 {
        let path = format!("./chains/chain_seq_len_{}.json", seq_len);
        let chain: CompiledChain = io::read_json(&path)?;

        let mut generated = Vec::with_capacity(gen_count);
        for _ in 0..gen_count {
            // At least 2 characters, with a bounded number of retries
            generated.push(chain.generate(&mut rng, 2, 100)?);
        }

        let existing = generated.iter().filter(|name| name_set.contains(*name)).count();
        println!();
        println!("{}", path);
        println!("{}", existing as f64 / gen_count as f64);
        println!("{:?}", &generated[..20]);
    }

    // The same counts can instead terminate on a length prior: before each
    // sample, an early-stop draw is made against a logistic curve over the
    // current output length
    let builder = ChainBuilder::from_corpus_file("./datasets/all_names.json", '^', '$', 3, true)?;
    let chain = builder.compile_with(TerminationPolicy::LengthBiased(LengthCurve::default()));
    println!();
    for i in 0..10 {
        println!("Length-biased name {}: {}", i + 1, chain.generate(&mut rng, 2, 100)?);
    }

    Ok(())
}

use clap::Parser;
use notechart::io;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "notechart")]
#[command(version = "0.1.0")]
#[command(about = "Inspect and normalize rhythm game chart note lists", long_about = None)]
struct Args {
    /// Input chart group file (.json, or gzipped with a .gz suffix)
    input: PathBuf,

    /// Write normalized JSON to this file (gzipped when it ends in .gz)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Output compact JSON (default is pretty-printed)
    #[arg(short, long)]
    compact: bool,

    /// Print what is active at this beat, per track and globally
    #[arg(short = 'b', long)]
    at_beat: Option<f64>,
}

fn main() -> Result<(), notechart::Error> {
    env_logger::init();
    let args = Args::parse();

    let record = io::read_group_file(&args.input)?;
    let bpm_list = record.bpm_list.clone();
    let store = record.into_store();

    println!("|  track  |  kind  |  buckets  |  notes  |      span  |");
    for (index, track) in store.tracks().iter().enumerate() {
        let notes: usize = track.iter().map(|(_, bucket)| bucket.len()).sum();
        let kind = if track.is_sustained() { "hold" } else { "note" };
        let name = if track.id.is_empty() {
            format!("#{}", index)
        } else {
            track.id.clone()
        };
        println!(
            "|  {:>5}  |  {:>4}  |  {:>7}  |  {:>5}  |  {:>8.2}  |",
            name,
            kind,
            track.len(),
            notes,
            track.effective_beats().unwrap_or(0.0),
        );
    }
    println!("global entries: {}", store.global().len());

    if let Some(beats) = args.at_beat {
        for (index, track) in store.tracks().iter().enumerate() {
            let at = track.node_at(beats, false);
            match track.bucket(at) {
                Some(bucket) => println!(
                    "track {}: bucket at {} ({} notes, ends {})",
                    index,
                    bucket.start_time(),
                    bucket.len(),
                    bucket.end_time(),
                ),
                None => println!("track {}: nothing at or before beat {}", index, beats),
            }
        }
        let at = store.global().node_at(beats);
        match store.global().entry(at) {
            Some(entry) => println!(
                "global: entry at {} ({} note / {} hold buckets, ends {})",
                entry.start_time(),
                entry.note_buckets().len(),
                entry.hold_buckets().len(),
                store.global_end_time(entry),
            ),
            None => println!("global: nothing at or before beat {}", beats),
        }
    }

    if let Some(output) = &args.output {
        let group = io::GroupJson::from_store(&store, bpm_list);
        io::write_group_file(output, &group, args.compact)?;
    }

    Ok(())
}

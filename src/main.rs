use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use log::{info, warn, Level};

use gene_subregions::{
    open_output, write_regions, AnnotationBuilder, FeatureSet, RegionConfig, RegionKind,
    RegionWalker, TranscriptTypes,
};

/// Derive sub-regions (TSS, introns, splice sites, alternate exons, ...) from gene annotation.
#[derive(Parser, Debug)]
#[command(name = "gene-subregions")]
#[command(author, version, about)]
struct Cli {
    /// Log debug messages (skipped transcripts, pruned duplicates)
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Collect regions from an annotation file or feature cache
    Regions(RegionArgs),

    /// Parse a GTF/GFF3 annotation once and write a binary feature cache
    Cache(CacheArgs),
}

#[derive(Args, Debug)]
struct Source {
    /// Input annotation file (.gtf/.gff/.gff3, optionally .gz)
    #[arg(long, short, conflicts_with = "cache", required_unless_present = "cache")]
    annotation: Option<PathBuf>,

    /// Feature cache written by the `cache` subcommand
    #[arg(long)]
    cache: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct RegionArgs {
    #[command(flatten)]
    source: Source,

    /// Region kind: tss, tts, exon, firstExon, lastExon, altExon, commonExon,
    /// intron, firstIntron, lastIntron, splice
    #[arg(long, short)]
    region: RegionKind,

    /// Transcript types to include, comma separated (mRNA, ncRNA, snRNA,
    /// snoRNA, tRNA, rRNA, miRNA, lncRNA, misc_RNA, all)
    #[arg(long, short, default_value = "mRNA")]
    transcripts: String,

    /// Allow mRNA and non-coding transcripts of one gene to be used together
    #[arg(long)]
    mix: bool,

    /// Adjust region start (5' end), in bp relative to the feature's strand
    #[arg(long, allow_hyphen_values = true, default_value_t = 0)]
    start_adj: i64,

    /// Adjust region stop (3' end), in bp relative to the feature's strand
    #[arg(long, allow_hyphen_values = true, default_value_t = 0)]
    stop_adj: i64,

    /// Drop near-duplicate regions within each gene
    #[arg(long, short)]
    unique: bool,

    /// Tolerance in bp for --unique
    #[arg(long, default_value_t = 0, requires = "unique")]
    slop: u32,

    /// Output table (.gz compresses; `-` is stdout)
    #[arg(long, short, default_value = "-")]
    out: PathBuf,
}

#[derive(Args, Debug)]
struct CacheArgs {
    /// Input annotation file (.gtf/.gff/.gff3, optionally .gz)
    #[arg(long, short)]
    annotation: PathBuf,

    /// Output cache file
    #[arg(long, short)]
    out: PathBuf,
}

fn load_features(source: &Source) -> Result<FeatureSet> {
    match (&source.annotation, &source.cache) {
        (Some(path), _) => AnnotationBuilder::new()
            .build_from_path(path)
            .with_context(|| format!("reading annotation {}", path.display())),
        (None, Some(path)) => {
            FeatureSet::load(path).with_context(|| format!("reading cache {}", path.display()))
        }
        (None, None) => bail!("either --annotation or --cache is required"),
    }
}

fn run_regions(args: RegionArgs) -> Result<()> {
    let types = TranscriptTypes::parse(&args.transcripts)?;
    let mut config = RegionConfig::new(args.region)
        .transcript_types(types)
        .mix_biotypes(args.mix)
        .adjust(args.start_adj, args.stop_adj);
    if args.unique {
        config = config.unique(args.slop);
    }

    let features = load_features(&args.source)?;
    info!("{} top-level features loaded", features.len());

    let walker = RegionWalker::new(config);
    let regions = walker
        .collect_all(&features.features)
        .context("collecting regions")?;

    if regions.is_empty() {
        warn!("no {} regions found", walker.config().kind.description());
    } else {
        info!("collected {} regions", regions.len());
    }

    let mut out = open_output(&args.out)
        .with_context(|| format!("opening output {}", args.out.display()))?;
    write_regions(&mut out, &walker.config().summary(), &regions)
        .and_then(|()| out.finish())
        .with_context(|| format!("writing regions to {}", args.out.display()))?;
    Ok(())
}

fn run_cache(args: CacheArgs) -> Result<()> {
    let features = AnnotationBuilder::new()
        .build_from_path(&args.annotation)
        .with_context(|| format!("reading annotation {}", args.annotation.display()))?;

    eprintln!("{features}");

    features
        .save(&args.out)
        .with_context(|| format!("writing cache to {}", args.out.display()))?;
    info!("feature cache written to {}", args.out.display());
    Ok(())
}

fn main() -> Result<()> {
    let start = std::time::Instant::now();
    let cli = Cli::parse();

    let level = if cli.verbose { Level::Debug } else { Level::Info };
    simple_logger::init_with_level(level).context("initialising logger")?;

    match cli.cmd {
        Command::Regions(args) => run_regions(args)?,
        Command::Cache(args) => run_cache(args)?,
    }

    info!("Elapsed time: {:?}", start.elapsed());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn region_kind_parses_directly() {
        let cli = Cli::try_parse_from([
            "gene-subregions",
            "regions",
            "-a",
            "genes.gtf",
            "--region",
            "first_intron",
            "--start-adj",
            "-5",
        ])
        .unwrap();
        let Command::Regions(args) = cli.cmd else {
            panic!("expected the regions subcommand");
        };
        assert_eq!(args.region, RegionKind::FirstIntron);
        assert_eq!(args.start_adj, -5);
    }

    #[test]
    fn unknown_region_kind_is_rejected() {
        let err = Cli::try_parse_from(["gene-subregions", "regions", "-a", "x.gtf", "-r", "utr"])
            .unwrap_err();
        assert!(err.to_string().contains("unknown region kind 'utr'"));
    }
}

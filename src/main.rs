use std::fs;
use std::io::{self, Write};

use anyhow::{anyhow, Context, Result};
use clap::{App, AppSettings, Arg, ArgMatches, SubCommand};
use log::{LevelFilter, Log, Metadata, Record};

use vsfs::consts::BLOCK_SIZE;
use vsfs::driver::file_drive::FileDrive;
use vsfs::driver::DeviceDriver;
use vsfs::{fuse, Config, FileSystem, InodeKind};

const SECTOR_SIZE: usize = 512;

struct StderrLogger;

impl Log for StderrLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            eprintln!("[{:<5} {}] {}", record.level(), record.target(), record.args());
        }
    }

    fn flush(&self) {}
}

static LOGGER: StderrLogger = StderrLogger;

fn init_logger(occurrences: u64) -> Result<()> {
    let level = match occurrences {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };
    log::set_logger(&LOGGER).map_err(|e| anyhow!("cannot install logger: {}", e))?;
    log::set_max_level(level);
    Ok(())
}

fn value<'a>(matches: &'a ArgMatches, name: &str) -> Result<&'a str> {
    matches.value_of(name).ok_or_else(|| anyhow!("missing argument <{}>", name))
}

fn config(matches: &ArgMatches) -> Result<Config> {
    let inodes = value(matches, "inodes")?.parse().context("--inodes expects a number")?;
    let blocks = value(matches, "blocks")?.parse().context("--blocks expects a number")?;
    Ok(Config::new(inodes, blocks)?)
}

fn open(image: &str, config: Config) -> Result<FileSystem<FileDrive>> {
    let drive = FileDrive::open(image, SECTOR_SIZE).with_context(|| format!("cannot open {}", image))?;
    Ok(FileSystem::load(drive, config)?)
}

fn kind_label(kind: InodeKind) -> &'static str {
    match kind {
        InodeKind::File => "file",
        InodeKind::Directory => "dir",
    }
}

fn info(fs: &FileSystem<FileDrive>) {
    let config = fs.config();
    let (inodes, blocks) = fs.usage();
    println!(
        "magic {:#08x}, {} inodes, {} data blocks starting at block {}",
        fs.magic(),
        config.inode_count(),
        config.data_block_count(),
        config.data_start()
    );
    println!("inode bitmap: {:?}", inodes);
    println!("data bitmap:  {:?}", blocks);
    for inode in fs.inodes() {
        println!(
            "{:>4} {:<4} {:>8} {:<24} {:?}",
            inode.index(),
            kind_label(inode.kind()),
            inode.size(),
            inode.name(),
            inode.pointers()
        );
    }
}

fn main() -> Result<()> {
    let image = Arg::with_name("image").required(true).help("Filesystem image file");
    let path = Arg::with_name("path").required(true).help("Absolute path inside the filesystem");

    let matches = App::new("vsfs")
        .about("Very simple inode filesystem on an image file")
        .setting(AppSettings::SubcommandRequiredElseHelp)
        .arg(Arg::with_name("verbose").short("v").multiple(true).help("Raise log verbosity"))
        .arg(
            Arg::with_name("inodes")
                .long("inodes")
                .takes_value(true)
                .default_value("32")
                .help("Inode slots"),
        )
        .arg(
            Arg::with_name("blocks")
                .long("blocks")
                .takes_value(true)
                .default_value("32")
                .help("Data blocks"),
        )
        .subcommand(SubCommand::with_name("format").about("Create and format an image").arg(image.clone()))
        .subcommand(SubCommand::with_name("info").about("Show bitmaps and inodes").arg(image.clone()))
        .subcommand(
            SubCommand::with_name("put")
                .about("Copy a host file into the filesystem")
                .arg(image.clone())
                .arg(path.clone())
                .arg(Arg::with_name("source").required(true).help("Host file to copy")),
        )
        .subcommand(SubCommand::with_name("mkdir").about("Create a directory").arg(image.clone()).arg(path.clone()))
        .subcommand(SubCommand::with_name("cat").about("Print a file").arg(image.clone()).arg(path))
        .subcommand(
            SubCommand::with_name("ls")
                .about("List a directory")
                .arg(image.clone())
                .arg(Arg::with_name("path").default_value("/")),
        )
        .subcommand(SubCommand::with_name("dump").about("Hex dump the non-zero parts of an image").arg(image.clone()))
        .subcommand(
            SubCommand::with_name("mount")
                .about("Mount an image read-only")
                .arg(image)
                .arg(Arg::with_name("mountpoint").required(true)),
        )
        .get_matches();

    init_logger(matches.occurrences_of("verbose"))?;
    let config = config(&matches)?;

    match matches.subcommand() {
        ("format", Some(sub)) => {
            let image = value(sub, "image")?;
            let bytes = config.total_blocks() * BLOCK_SIZE as u64;
            let drive = FileDrive::create(image, bytes, SECTOR_SIZE).with_context(|| format!("cannot create {}", image))?;
            FileSystem::format(drive, config)?;
            println!("formatted {} ({} bytes)", image, bytes);
        }
        ("info", Some(sub)) => info(&open(value(sub, "image")?, config)?),
        ("put", Some(sub)) => {
            let source = value(sub, "source")?;
            let content = fs::read(source).with_context(|| format!("cannot read {}", source))?;
            let mut fs = open(value(sub, "image")?, config)?;
            let inode = fs.create_file(value(sub, "path")?, &content)?;
            println!("inode {}", inode.index());
        }
        ("mkdir", Some(sub)) => {
            let mut fs = open(value(sub, "image")?, config)?;
            let inode = fs.create_directory(value(sub, "path")?)?;
            println!("inode {}", inode.index());
        }
        ("cat", Some(sub)) => {
            let fs = open(value(sub, "image")?, config)?;
            let index = fs.resolve(value(sub, "path")?)?.index();
            io::stdout().write_all(&fs.read_file(index)?)?;
        }
        ("ls", Some(sub)) => {
            let fs = open(value(sub, "image")?, config)?;
            let index = fs.resolve(value(sub, "path")?)?.index();
            for entry in fs.read_directory(index)? {
                println!(
                    "{:>4} {:<4} {:>8} {}",
                    entry.inode.index(),
                    kind_label(entry.inode.kind()),
                    entry.inode.size(),
                    entry.name
                );
            }
        }
        ("dump", Some(sub)) => {
            let image = value(sub, "image")?;
            let drive = FileDrive::open(image, SECTOR_SIZE).with_context(|| format!("cannot open {}", image))?;
            drive.dump(&mut io::stdout().lock())?;
        }
        ("mount", Some(sub)) => {
            let fs = open(value(sub, "image")?, config)?;
            fuse::mount(fs, value(sub, "mountpoint")?)?;
        }
        _ => unreachable!("clap requires a subcommand"),
    }

    Ok(())
}

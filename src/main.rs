use std::{io::Write, process::ExitCode, sync::Arc, time::Duration};

use clap::{Arg, ArgAction, ArgMatches, Command};
use tracing::{error, info, span, Level};

use bucketfs::{
    adapters::{gcs::GcsClient, mock::MockClient, s3::S3Client, SignedUrlOptions, StorageClient},
    util::{
        object::{self, Provider},
        poll::Blocking,
    },
    model::fs::EntryType,
    AdapterConfig, FSError, Filesystem, ListingEntry, ObjectFS, Visibility, WriteConfig,
};

fn cli() -> Command {
    let path = || Arg::new("PATH").required(true);

    Command::new("bucketfs")
        .about("Filesystem operations over an object storage bucket")
        .arg(
            Arg::new("BUCKET_URI")
                .help("gs://bucket[/prefix], s3://bucket[/prefix] or mem://bucket")
                .required(true)
                .index(1),
        )
        .arg(
            Arg::new("prefix")
                .long("prefix")
                .env("BUCKETFS_PREFIX")
                .help("Key prefix every path is stored under"),
        )
        .arg(
            Arg::new("api-uri")
                .long("api-uri")
                .env("BUCKETFS_API_URI")
                .help("Public endpoint used when building object URLs"),
        )
        .subcommand_required(true)
        .subcommand(
            Command::new("ls")
                .arg(Arg::new("PATH"))
                .arg(
                    Arg::new("recursive")
                        .long("recursive")
                        .short('r')
                        .action(ArgAction::SetTrue),
                ),
        )
        .subcommand(Command::new("stat").arg(path()))
        .subcommand(Command::new("cat").arg(path()))
        .subcommand(
            Command::new("put")
                .arg(path())
                .arg(Arg::new("FILE").required(true))
                .arg(Arg::new("public").long("public").action(ArgAction::SetTrue)),
        )
        .subcommand(Command::new("mkdir").arg(path()))
        .subcommand(Command::new("rm").arg(path()))
        .subcommand(Command::new("rmdir").arg(path()))
        .subcommand(
            Command::new("cp")
                .arg(Arg::new("SRC").required(true))
                .arg(Arg::new("DST").required(true)),
        )
        .subcommand(
            Command::new("mv")
                .arg(Arg::new("SRC").required(true))
                .arg(Arg::new("DST").required(true)),
        )
        .subcommand(
            Command::new("visibility").arg(path()).arg(
                Arg::new("VISIBILITY")
                    .value_parser(["public", "private"])
                    .required(false),
            ),
        )
        .subcommand(Command::new("url").arg(path()))
        .subcommand(
            Command::new("signed-url").arg(path()).arg(
                Arg::new("expires")
                    .long("expires")
                    .value_parser(clap::value_parser!(u64))
                    .default_value("3600"),
            ),
        )
}

fn arg<'a>(matches: &'a ArgMatches, name: &str) -> &'a str {
    matches
        .get_one::<String>(name)
        .map(|s| s.as_str())
        .unwrap_or_default()
}

fn new_client(
    provider: Provider,
    bucket: &str,
    blocking: Arc<Blocking>,
) -> Result<Arc<dyn StorageClient>, FSError> {
    let client: Arc<dyn StorageClient> = match provider {
        Provider::GCS => Arc::new(GcsClient::from_env(bucket, blocking)?),
        Provider::AWS => Arc::new(S3Client::from_env(bucket, blocking)),
        Provider::Memory => Arc::new(MockClient::new(bucket)),
    };

    Ok(client)
}

fn print_entry(entry: &ListingEntry) {
    match entry {
        ListingEntry::Object(meta) => println!(
            "{}\t{}\t{}\t{}",
            meta.kind,
            meta.size,
            meta.timestamp.unwrap_or_default(),
            meta.path
        ),
        ListingEntry::Emulated(dir) => println!("{}\t-\t-\t{}", EntryType::Dir, dir.path),
    }
}

fn run(matches: &ArgMatches) -> Result<(), FSError> {
    let uri = object::parse_bucket_uri(arg(matches, "BUCKET_URI"))?;
    info!(bucket = %uri.bucket, provider = ?uri.provider, "args");

    let mut config = AdapterConfig::default();
    if let Some(prefix) = matches.get_one::<String>("prefix").or(uri.prefix.as_ref()) {
        config = config.with_path_prefix(prefix);
    }
    if let Some(api_uri) = matches.get_one::<String>("api-uri") {
        config = config.with_storage_api_uri(api_uri);
    }

    let blocking = Arc::new(Blocking::new()?);
    let client = new_client(uri.provider, &uri.bucket, blocking)?;
    let fs = ObjectFS::new(client, config);

    match matches.subcommand() {
        Some(("ls", sub)) => {
            let recursive = sub.get_flag("recursive");
            for entry in fs.list_contents(arg(sub, "PATH"), recursive)? {
                print_entry(&entry);
            }
        }
        Some(("stat", sub)) => {
            let meta = fs.metadata(arg(sub, "PATH"))?;
            println!("path: {}", meta.path);
            println!("type: {}", meta.kind);
            println!("size: {}", meta.size);
            println!("mimetype: {}", meta.mimetype);
            if let Some(timestamp) = meta.timestamp {
                println!("timestamp: {}", timestamp);
            }
            println!("visibility: {}", fs.visibility(arg(sub, "PATH"))?);
        }
        Some(("cat", sub)) => {
            let contents = fs.read(arg(sub, "PATH"))?;
            std::io::stdout().write_all(&contents)?;
        }
        Some(("put", sub)) => {
            let contents = std::fs::read(arg(sub, "FILE"))?;
            let mut write_config = WriteConfig::default();
            if sub.get_flag("public") {
                write_config = write_config.with_visibility(Visibility::Public);
            }
            let meta = fs.write(arg(sub, "PATH"), &contents, &write_config)?;
            println!("{}\t{}", meta.size, meta.path);
        }
        Some(("mkdir", sub)) => {
            fs.create_directory(arg(sub, "PATH"), &WriteConfig::default())?;
        }
        Some(("rm", sub)) => fs.delete(arg(sub, "PATH"))?,
        Some(("rmdir", sub)) => fs.delete_directory(arg(sub, "PATH"))?,
        Some(("cp", sub)) => fs.copy(arg(sub, "SRC"), arg(sub, "DST"))?,
        Some(("mv", sub)) => fs.move_object(arg(sub, "SRC"), arg(sub, "DST"))?,
        Some(("visibility", sub)) => match sub.get_one::<String>("VISIBILITY") {
            Some(visibility) => fs.set_visibility(arg(sub, "PATH"), visibility.parse()?)?,
            None => println!("{}", fs.visibility(arg(sub, "PATH"))?),
        },
        Some(("url", sub)) => println!("{}", fs.url(arg(sub, "PATH"))?),
        Some(("signed-url", sub)) => {
            let expires = sub.get_one::<u64>("expires").copied().unwrap_or(3600);
            let url = fs.temporary_url(
                arg(sub, "PATH"),
                Duration::from_secs(expires),
                &SignedUrlOptions::default(),
            )?;
            println!("{}", url);
        }
        _ => {
            return Err(FSError::InvalidArgument {
                message: "unknown command".to_string(),
            })
        }
    }

    Ok(())
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .json()
        .with_writer(std::io::stderr)
        .init();

    let span = span!(Level::INFO, "main", context = "main");
    let _e = span.enter();
    info!("called");

    let matches = cli().get_matches();

    match run(&matches) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!(error_message=%err, error_group="main");
            eprintln!("bucketfs: {}", err);
            ExitCode::FAILURE
        }
    }
}

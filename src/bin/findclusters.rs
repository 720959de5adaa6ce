use chrono::{NaiveDate, Utc};
use clap::Parser;
use crossbeam_channel::{bounded, Receiver, Sender};
use epicluster::{
    read_case_records, BoundingBox, ClusterConfig, ClusterList, Coord, EpiClusterResult, KmlFile,
    KmlWriter, RawCaseRecord,
};
use log::LevelFilter;
use simple_logger::SimpleLogger;
use std::{
    fmt::{self, Display},
    path::PathBuf,
    thread::{self, JoinHandle},
};

const CHANNEL_SIZE: usize = 16;

/*-------------------------------------------------------------------------------------------------
 *                               Parse Command Line Arguments
 *-----------------------------------------------------------------------------------------------*/
///
/// Find clusters of disease cases that are close together in space and time.
///
/// Each CSV file is treated as an independent set of cases. The expected header is
/// location_id,latitude,longitude,event_dates,disease,group_id where event_dates is a list of
/// YYYY-MM-DD dates separated by ';'.
///
#[derive(Debug, Parser)]
#[clap(name = "findclusters")]
#[clap(author, version, about)]
struct FindClustersOptionsInit {
    /// A CSV file of case records, or a directory to search for CSV files.
    input: PathBuf,

    /// Maximum distance in meters between two directly linked cases.
    #[clap(short, long, default_value_t = 200.0)]
    #[clap(env = "EPICLUSTER_RADIUS_METERS")]
    radius_meters: f64,

    /// Maximum number of days between two directly linked cases.
    #[clap(short, long, default_value_t = 18)]
    #[clap(env = "EPICLUSTER_WINDOW_DAYS")]
    window_days: i64,

    /// Minimum number of other cases a case must be linked to before a cluster grows from it.
    #[clap(short, long, default_value_t = 2)]
    #[clap(env = "EPICLUSTER_MIN_LINKED")]
    min_linked_events: usize,

    /// Disease names to include, matched case-insensitively anywhere in the label. May be
    /// repeated. If none are given dengue, zika, and chikungunya are used.
    #[clap(short, long = "disease")]
    diseases: Vec<String>,

    /// Include every record from this group regardless of disease.
    #[clap(short, long)]
    group: Option<u64>,

    /// Only use records inside this box, given as bottom_lat,left_lon,top_lat,right_lon
    #[clap(short, long, parse(try_from_str=parse_bbox))]
    bbox: Option<BoundingBox>,

    /// The path to a KML file to produce from this run.
    #[clap(short, long)]
    kml_file: Option<PathBuf>,

    /// Judge cluster activity as of this date (YYYY-MM-DD) instead of today.
    #[clap(short, long, parse(try_from_str=parse_date))]
    as_of: Option<NaiveDate>,

    /// Verbose output
    #[clap(short, long)]
    verbose: bool,
}

/// Parse a bounding box argument.
fn parse_bbox(bbox_str: &str) -> Result<BoundingBox, String> {
    let corners = bbox_str
        .split(',')
        .map(|c| c.trim().parse::<f64>())
        .collect::<Result<Vec<_>, _>>()
        .map_err(|err| format!("Invalid coordinate in bounding box: {}", err))?;

    if corners.len() != 4 {
        return Err("Invalid number of coords".to_owned());
    }

    let (min_lat, min_lon, max_lat, max_lon) = (corners[0], corners[1], corners[2], corners[3]);

    if min_lat >= max_lat || min_lon >= max_lon {
        return Err(format!(
            concat!(
                "Minimum Lat/Lon must be less than Maximum Lat/Lon:",
                " min_lat={} max_lat={} min_lon={} max_lon={}"
            ),
            min_lat, max_lat, min_lon, max_lon
        ));
    }

    if min_lat < -90.0 || max_lat > 90.0 || min_lon < -180.0 || max_lon > 180.0 {
        return Err(format!(
            concat!(
                "Lat/Lon are out of range (-90.0 to 90.0 and -180.0 to 180.0):",
                " min_lat={} max_lat={} min_lon={} max_lon={}"
            ),
            min_lat, max_lat, min_lon, max_lon
        ));
    }

    let ll = Coord {
        lat: min_lat,
        lon: min_lon,
    };
    let ur = Coord {
        lat: max_lat,
        lon: max_lon,
    };

    Ok(BoundingBox { ll, ur })
}

/// Parse a command line date
fn parse_date(date_str: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(date_str, "%Y-%m-%d").map_err(|err| err.to_string())
}

#[derive(Debug)]
struct FindClustersOptionsChecked {
    /// Where to look for case records.
    input: PathBuf,

    /// Detection parameters.
    config: ClusterConfig,

    /// Optional area restriction.
    bbox: Option<BoundingBox>,

    /// Optional KML output.
    kml_file: Option<PathBuf>,

    /// The date activity is judged against.
    as_of: NaiveDate,

    /// Verbose output
    verbose: bool,
}

impl Display for FindClustersOptionsChecked {
    fn fmt(&self, f: &mut fmt::Formatter) -> Result<(), fmt::Error> {
        let config = &self.config;

        writeln!(f, "\n")?; // yes, two blank lines.
        writeln!(f, "           Input: {}", self.input.display())?;
        writeln!(f, "      Radius (m): {}", config.radius_meters)?;
        writeln!(f, "   Window (days): {}", config.window_days)?;
        writeln!(f, "      Min Linked: {}", config.min_linked_events)?;
        writeln!(f, "        Diseases: {}", config.disease_allowlist.join(", "))?;

        if let Some(group) = config.target_group {
            writeln!(f, "           Group: {}", group)?;
        }

        if let Some(bbox) = self.bbox {
            writeln!(f, "    Bounding Box: {}", bbox)?;
        }

        if let Some(ref kml_file) = self.kml_file {
            writeln!(f, "      Output KML: {}", kml_file.display())?;
        }

        writeln!(f, "           As Of: {}", self.as_of)?;
        writeln!(f, "\n")?; // yes, two blank lines.

        Ok(())
    }
}

/// Get the command line arguments and check them.
fn parse_args() -> EpiClusterResult<FindClustersOptionsChecked> {
    let FindClustersOptionsInit {
        input,
        radius_meters,
        window_days,
        min_linked_events,
        diseases,
        group,
        bbox,
        kml_file,
        as_of,
        verbose,
    } = FindClustersOptionsInit::parse();

    let mut config = ClusterConfig::default()
        .with_radius_meters(radius_meters)
        .with_window_days(window_days)
        .with_min_linked_events(min_linked_events)
        .with_target_group(group);

    if !diseases.is_empty() {
        config = config.with_diseases(diseases);
    }

    config.validate()?;

    let as_of = as_of.unwrap_or_else(|| Utc::now().date_naive());

    Ok(FindClustersOptionsChecked {
        input,
        config,
        bbox,
        kml_file,
        as_of,
        verbose,
    })
}

/*-------------------------------------------------------------------------------------------------
 *                                             MAIN
 *-----------------------------------------------------------------------------------------------*/
fn main() -> EpiClusterResult<()> {
    let opts = parse_args()?;

    let level = if opts.verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };
    SimpleLogger::new().with_level(level).init()?;

    log::debug!("{}", opts);

    let (to_load_thread, from_path_gen) = bounded(CHANNEL_SIZE);
    let (to_analysis, from_load_thread) = bounded(CHANNEL_SIZE);
    let (to_main_thread, from_analysis_threads) = bounded(CHANNEL_SIZE);

    let path_gen = start_path_generation_thread(opts.input.clone(), to_load_thread)?;
    let load_thread = start_load_thread(opts.bbox, from_path_gen, to_analysis)?;
    let anal_threads = start_analysis_threads(
        opts.config.clone(),
        opts.as_of,
        from_load_thread,
        to_main_thread,
    )?;

    let mut cluster_lists: Vec<ClusterList> = from_analysis_threads.iter().collect();

    path_gen
        .join()
        .map_err(|_| "path generation thread panicked")?;
    load_thread.join().map_err(|_| "load thread panicked")?;
    for jh in anal_threads {
        jh.join().map_err(|_| "analysis thread panicked")?;
    }

    // Workers finish in any order.
    cluster_lists.sort_by(|a, b| a.source.cmp(&b.source));

    report(&cluster_lists);

    if let Some(ref kml_path) = opts.kml_file {
        let mut kfile = KmlFile::new(kml_path)?;
        kfile.write_cluster_styles()?;

        for list in &cluster_lists {
            kfile.write_cluster_list(list)?;
        }

        log::info!("wrote {}", kml_path.display());
    }

    Ok(())
}

fn report(cluster_lists: &[ClusterList]) {
    if cluster_lists.is_empty() {
        log::warn!("");
        log::warn!("No case record files were processed!");
        log::warn!("");
        return;
    }

    for list in cluster_lists {
        log::info!("");
        for line in list.to_string().lines() {
            log::info!("{}", line);
        }

        for cluster in &list.clusters {
            log::debug!("");
            for line in cluster.to_string().lines() {
                log::debug!("{}", line);
            }
        }
    }

    let num_clusters: usize = cluster_lists.iter().map(|l| l.clusters.len()).sum();
    let num_active: usize = cluster_lists.iter().map(|l| l.num_active()).sum();

    log::info!("");
    log::info!("Run Summary:");
    log::info!("          files - {:>9}", cluster_lists.len());
    log::info!("       clusters - {:>9}", num_clusters);
    log::info!("         active - {:>9}", num_active);

    let biggest = cluster_lists
        .iter()
        .filter_map(|l| l.largest().map(|c| (l, c)))
        .max_by_key(|(_, c)| c.total_cases);

    if let Some((list, cluster)) = biggest {
        log::info!("");
        log::info!("Biggest cluster:");
        log::info!("         source - {}", list.source);
        log::info!("             id - {}", cluster.id);
        log::info!("          cases - {:>9}", cluster.total_cases);
        log::info!("      locations - {:>9}", cluster.unique_locations);
        log::info!("       latitude - {:>9.6}", cluster.center_lat);
        log::info!("      longitude - {:>9.6}", cluster.center_lng);
    }
    log::info!("");
}

/*-------------------------------------------------------------------------------------------------
 *                                     Processing Pipeline
 *-----------------------------------------------------------------------------------------------*/
fn start_path_generation_thread(
    input: PathBuf,
    to_load_thread: Sender<PathBuf>,
) -> EpiClusterResult<JoinHandle<()>> {
    let jh = thread::Builder::new()
        .name("findclusters-path_gen".to_owned())
        .spawn(move || {
            for entry in walkdir::WalkDir::new(&input)
                .sort_by_file_name()
                .into_iter()
                .filter_map(|res| match res {
                    Ok(entry) => Some(entry),
                    Err(err) => {
                        log::error!("Error searching {}: {}", input.display(), err);
                        None
                    }
                })
                // Ignore directories, WalkDir will take care of recursing into them.
                .filter(|entry| entry.path().is_file())
                // Only consider CSV files.
                .filter(|entry| {
                    entry
                        .path()
                        .extension()
                        .map(|ext| ext.eq_ignore_ascii_case("csv"))
                        .unwrap_or(false)
                })
            {
                log::debug!("Found {}", entry.path().display());
                if to_load_thread.send(entry.into_path()).is_err() {
                    break;
                }
            }
        })?;

    Ok(jh)
}

fn start_load_thread(
    bbox: Option<BoundingBox>,
    from_path_gen: Receiver<PathBuf>,
    to_analysis: Sender<(String, Vec<RawCaseRecord>)>,
) -> EpiClusterResult<JoinHandle<()>> {
    let jh = thread::Builder::new()
        .name("findclusters-load".to_owned())
        .spawn(move || {
            for path in from_path_gen {
                let mut records = match read_case_records(&path) {
                    Ok(records) => records,
                    Err(err) => {
                        log::error!("Error loading {}: {}", path.display(), err);
                        continue;
                    }
                };

                if let Some(bbox) = bbox {
                    let before = records.len();
                    records.retain(|r| {
                        let coord = Coord {
                            lat: r.latitude,
                            lon: r.longitude,
                        };
                        bbox.contains(coord, 0.0)
                    });
                    log::debug!(
                        "{} of {} records inside {}",
                        records.len(),
                        before,
                        bbox
                    );
                }

                let source = path.display().to_string();
                if to_analysis.send((source, records)).is_err() {
                    break;
                }
            }
        })?;

    Ok(jh)
}

fn start_analysis_threads(
    config: ClusterConfig,
    as_of: NaiveDate,
    from_load_thread: Receiver<(String, Vec<RawCaseRecord>)>,
    to_main_thread: Sender<ClusterList>,
) -> EpiClusterResult<Vec<JoinHandle<()>>> {
    let num_threads = num_cpus::get().max(1);

    let mut handles = Vec::with_capacity(num_threads);
    for i in 0..num_threads {
        let config = config.clone();
        let from_load_thread = from_load_thread.clone();
        let to_main_thread = to_main_thread.clone();

        let jh = thread::Builder::new()
            .name(format!("findclusters-analysis-{}", i))
            .spawn(move || {
                for (source, records) in from_load_thread {
                    let clusters = ClusterList::from_records(&source, &records, &config, as_of);
                    if to_main_thread.send(clusters).is_err() {
                        break;
                    }
                }
            })?;

        handles.push(jh);
    }

    Ok(handles)
}

use std::error::Error;
use std::path::{Path, PathBuf};

use clap::Parser;
use routetrace::{osm, Coordinate, Edge, Mode, SearchOptions, Step};

#[derive(Debug, thiserror::Error)]
#[error("{0}: {1}")]
struct GraphLoadError(PathBuf, #[source] osm::Error);

#[derive(Debug, thiserror::Error)]
#[error("no road accessible by {0} near {1}, {2}")]
struct SnapError(Mode, f64, f64);

#[derive(Parser)]
struct Cli {
    /// The path to the OSM file
    osm_file: PathBuf,

    /// Latitude of the start point
    start_lat: f64,

    /// Longitude of the start point
    start_lon: f64,

    /// Latitude of the end point
    end_lat: f64,

    /// Longitude of the end point
    end_lon: f64,

    /// Mode of transport
    #[arg(short, long, value_enum, default_value_t = Mode::Car)]
    mode: Mode,

    /// Ignore one-way streets (for cars), turn restrictions and barriers
    #[arg(long)]
    ignore_restrictions: bool,

    /// Format of the OSM file
    #[arg(short, long, value_enum, default_value_t = osm::FileFormat::Unknown)]
    format: osm::FileFormat,

    /// Also output every edge explored by the search
    #[arg(long)]
    trace: bool,

    /// Increase logging verbosity
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

pub fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();

    colog::basic_builder()
        .filter_level(match cli.verbose {
            0 => log::LevelFilter::Warn,
            1 => log::LevelFilter::Info,
            _ => log::LevelFilter::Debug,
        })
        .init();

    let g = load_graph(&cli.osm_file, cli.format)?;

    let start = routetrace::snap_to_road(&g, cli.start_lat, cli.start_lon, cli.mode)
        .ok_or(SnapError(cli.mode, cli.start_lat, cli.start_lon))?;

    let end = routetrace::snap_to_road(&g, cli.end_lat, cli.end_lon, cli.mode)
        .ok_or(SnapError(cli.mode, cli.end_lat, cli.end_lon))?;

    let options = SearchOptions {
        ignore_restrictions: cli.ignore_restrictions,
    };

    let mut explored: Vec<&Edge> = Vec::new();
    let mut route = None;
    for step in routetrace::search(&g, start.node_id, end.node_id, cli.mode, options) {
        match step {
            Step::Explore { edge, .. } => {
                if cli.trace {
                    explored.push(edge);
                }
            }
            Step::Done(r) => route = Some(r),
            Step::NoRoute => log::error!(
                "no route from {} to {} by {}",
                start.node_id,
                end.node_id,
                cli.mode
            ),
        }
    }

    let mut features: Vec<String> = explored
        .iter()
        .map(|e| feature(&e.geometry, &format!("\"kind\": \"explored\", \"way_id\": {}", e.way_id)))
        .collect();

    if let Some(route) = route {
        let edges = routetrace::trim_route_to_snap_points(&route.edges, &start, &end);
        let mut coordinates: Vec<Coordinate> = Vec::new();
        for edge in &edges {
            for &c in &edge.geometry {
                if coordinates.last() != Some(&c) {
                    coordinates.push(c);
                }
            }
        }

        let distance: f64 = edges.iter().map(|e| e.distance).sum();
        features.push(feature(
            &coordinates,
            &format!(
                "\"kind\": \"route\", \"distance_m\": {:.1}, \"time_s\": {:.1}",
                distance, route.time
            ),
        ));
    }

    println!("{{");
    println!("  \"type\": \"FeatureCollection\",");
    println!("  \"features\": [");

    let mut features = features.iter().peekable();
    while let Some(feature) = features.next() {
        let suffix = if features.peek().is_some() { "," } else { "" };
        println!("{}{}", feature, suffix);
    }

    println!("  ]");
    println!("}}");

    Ok(())
}

fn feature(coordinates: &[Coordinate], properties: &str) -> String {
    let coordinates = coordinates
        .iter()
        .map(|c| format!("[{}, {}]", c.lon, c.lat))
        .collect::<Vec<_>>()
        .join(", ");

    format!(
        "    {{\"type\": \"Feature\", \"properties\": {{{}}}, \"geometry\": {{\"type\": \"LineString\", \"coordinates\": [{}]}}}}",
        properties, coordinates
    )
}

fn load_graph<P: AsRef<Path>>(path: P, format: osm::FileFormat) -> Result<routetrace::Graph, GraphLoadError> {
    osm::parse_file(path.as_ref(), format).map_err(|e| GraphLoadError(PathBuf::from(path.as_ref()), e))
}

use clap::{Parser, Subcommand};

use activity_search::semantic::DEFAULT_TOP_K;

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct Args {
    /// Dataset path or http(s) URL. Overrides the environment and config file.
    #[clap(long, global = true)]
    pub dataset: Option<String>,

    /// Build the index before running the command
    #[clap(long, global = true, default_value = "false")]
    pub eager: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Find activities whose names are closest to a free-text query
    Search {
        /// Free-text query, e.g. "rainy day museum"
        query: String,

        /// Number of results
        #[clap(short = 'k', long, default_value_t = DEFAULT_TOP_K)]
        top_k: usize,

        /// Include the distance of each result
        #[clap(short, long, default_value = "false")]
        scores: bool,

        /// Only print the number of results
        #[clap(short, long, default_value = "false")]
        count: bool,
    },

    /// Load the dataset and model, then print index statistics
    Stats {},
}

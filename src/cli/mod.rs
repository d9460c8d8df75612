use clap::Subcommand;

#[derive(Subcommand)]
pub enum Commands {
    /// Split documents into sentences and store each as a collection
    Add {
        /// Files or directories; directories are walked recursively
        #[arg(required = true)]
        paths: Vec<String>,

        /// Collection name for a single file (defaults to the file stem)
        #[arg(short, long)]
        name: Option<String>,

        /// File extensions picked up when walking directories
        #[arg(long, default_value = "txt")]
        ext: Vec<String>,
    },

    List,

    Remove {
        name: String,
    },

    /// Print sentences of a collection, optionally filtered
    Read {
        name: String,

        /// First sentence number to include
        #[arg(long)]
        from: Option<u64>,

        /// Sentence number to stop before
        #[arg(long)]
        to: Option<u64>,

        /// Keep only sentences matching this regular expression
        #[arg(short, long)]
        grep: Option<String>,

        #[arg(long)]
        json: bool,
    },

    /// Print the sentences closest in meaning to a text
    Similar {
        name: String,

        text: String,

        /// How many sentences to return
        #[arg(short = 'k', long, default_value = "3")]
        top: usize,

        #[arg(long)]
        json: bool,
    },

    /// Print a collection as one space-joined string
    Blob {
        name: String,
    },

    /// Print the backend's own documents for a collection
    Raw {
        name: String,
    },

    Stats,
}

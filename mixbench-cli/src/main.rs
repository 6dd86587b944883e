//! The `mixbench` binary.
#![warn(missing_docs)]
#![warn(missing_debug_implementations)]

fn main() -> anyhow::Result<()> {
    mixbench_cli::cli::execute()
}

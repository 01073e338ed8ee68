//! Main entry point for the demo runner.

fn main() -> anyhow::Result<()> {
    graphql_engine::main()
}

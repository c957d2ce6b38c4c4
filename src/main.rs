use anyhow::Context;

fn main() -> anyhow::Result<()> {
    memecrop::run().context("memecrop failed")
}

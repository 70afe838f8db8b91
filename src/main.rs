//! Build program for this repository
//!
//! `stagehand` builds, `stagehand test` also runs the test suite and
//! `stagehand ci` adds formatting and lint checks in parallel.

use stagehand::{Action, Cmd, Context, Pipeline, Pipelines, Step};

fn cargo(args: &[&str]) -> Cmd {
    Cmd::new("cargo").args(args.iter().copied())
}

fn pipelines() -> Pipelines {
    let build = Pipeline::new("build")
        .sequential(Step::new("build", cargo(&["build", "--all-targets"]).run()));

    // Anything after `--` goes to the test binaries.
    let test = Pipeline::create_from(&build, "test").sequential(Step::new(
        "test",
        Action::new(|ctx: Context| async move {
            let cmd = cargo(&["test", "--"]).args(ctx.extra_args().to_vec());
            cmd.run().run(ctx).await
        }),
    ));

    let ci = Pipeline::create_from(&test, "ci").parallel([
        Step::new("fmt", cargo(&["fmt", "--check"]).run()),
        Step::new(
            "clippy",
            cargo(&["clippy", "--all-targets", "--", "-D", "warnings"]).run(),
        ),
    ]);

    Pipelines::new()
        .default_pipeline(build)
        .add(test)
        .add(ci)
}

#[tokio::main]
async fn main() {
    let code = pipelines().run().await;
    std::process::exit(code);
}

use vergen_gitcl::{BuildBuilder, CargoBuilder, Emitter, GitclBuilder, RustcBuilder};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let build = BuildBuilder::all_build()?;
    let cargo = CargoBuilder::all_cargo()?;
    let rustc = RustcBuilder::all_rustc()?;
    let gitcl = GitclBuilder::all_git();

    let mut emitter = Emitter::default();
    emitter
        .add_instructions(&build)?
        .add_instructions(&cargo)?
        .add_instructions(&rustc)?;

    // Outside a git checkout (container builds) the SHA comes from the build args
    if let Ok(git) = gitcl {
        emitter.add_instructions(&git)?;
    } else {
        println!(
            "cargo::rustc-env=VERGEN_GIT_SHA={}",
            std::env::var("VERGEN_GIT_SHA").unwrap_or_else(|_| "unknown".to_string())
        );
        println!(
            "cargo::rustc-env=VERGEN_GIT_DIRTY={}",
            std::env::var("VERGEN_GIT_DIRTY").unwrap_or_else(|_| "false".to_string())
        );
    }

    emitter.emit()?;

    Ok(())
}

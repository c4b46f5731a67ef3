//! jil - command-line entry point for the interpreter/JIT core.
//!
//! The grammar/parser front end is out of scope for this crate (spec.md
//! §1), so the "source" this binary loads is already-parsed AST JSON
//! (a serialized `jil_core::ast::Module`) rather than concrete `.jil`
//! syntax. A real front end would tokenize/parse and hand the resulting
//! tree straight to `run`; this binary's `--grammar` flag is accepted for
//! interface compatibility with that eventual front end but is otherwise
//! unused here.

use std::path::{Path, PathBuf};
use std::process;
use std::rc::Rc;
use std::cell::RefCell;

use jil_core::ast::Module;
use jil_core::config::Config;
use jil_core::interp::builtins::build_builtin_env;
use jil_core::interp::eval::{eval_module, Runtime};
use jil_core::jit::JitEngine;

const VERSION: &str = env!("CARGO_PKG_VERSION");

fn print_usage() {
    eprintln!("jil v{VERSION}");
    eprintln!();
    eprintln!("USAGE:");
    eprintln!("    jil [OPTIONS] <INPUT>");
    eprintln!();
    eprintln!("OPTIONS:");
    eprintln!("    -h, --help              Print this help message");
    eprintln!("    -v, --version           Print version information");
    eprintln!("    -g, --grammar <FILE>    Grammar file for the front end (unused by this core)");
    eprintln!("    --cache-dir <DIR>       Directory for jitted_functions.s/.so (default .jil_cache)");
    eprintln!("    --jit                   Enable the JIT back end (default: on)");
    eprintln!("    --no-jit                Disable the JIT back end, interpreter only");
    eprintln!("    --no-shadow             Disable shadow execution (JIT result authoritative alone)");
    eprintln!("    --strict                Abort on interpreter/JIT divergence instead of logging it");
    eprintln!("    -c, --config <FILE>     Load `jil.toml`-style config from FILE");
    eprintln!();
    eprintln!("ARGUMENTS:");
    eprintln!("    <INPUT>                 Parsed-AST JSON file (use '-' for stdin)");
}

fn print_version() {
    println!("jil {VERSION}");
}

struct Options {
    input: Option<String>,
    grammar: Option<PathBuf>,
    config_path: Option<PathBuf>,
    cache_dir: Option<PathBuf>,
    jit_enabled: Option<bool>,
    shadow_enabled: Option<bool>,
    strict: Option<bool>,
}

fn parse_args() -> Result<Options, String> {
    let args: Vec<String> = std::env::args().collect();

    let mut input = None;
    let mut grammar = None;
    let mut config_path = None;
    let mut cache_dir = None;
    let mut jit_enabled = None;
    let mut shadow_enabled = None;
    let mut strict = None;
    let mut i = 1;

    while i < args.len() {
        match args[i].as_str() {
            "-h" | "--help" => {
                print_usage();
                process::exit(0);
            }
            "-v" | "--version" => {
                print_version();
                process::exit(0);
            }
            "-g" | "--grammar" => {
                i += 1;
                let val = args.get(i).ok_or("missing path after -g/--grammar")?;
                grammar = Some(PathBuf::from(val));
            }
            "-c" | "--config" => {
                i += 1;
                let val = args.get(i).ok_or("missing path after -c/--config")?;
                config_path = Some(PathBuf::from(val));
            }
            "--cache-dir" => {
                i += 1;
                let val = args.get(i).ok_or("missing path after --cache-dir")?;
                cache_dir = Some(PathBuf::from(val));
            }
            "--jit" => jit_enabled = Some(true),
            "--no-jit" => jit_enabled = Some(false),
            "--no-shadow" => shadow_enabled = Some(false),
            "--strict" => strict = Some(true),
            arg if arg.starts_with('-') && arg != "-" => {
                return Err(format!("unknown option: {arg}"));
            }
            arg => {
                if input.is_some() {
                    return Err("multiple input files specified".to_string());
                }
                input = Some(arg.to_string());
            }
        }
        i += 1;
    }

    Ok(Options {
        input,
        grammar,
        config_path,
        cache_dir,
        jit_enabled,
        shadow_enabled,
        strict,
    })
}

fn read_input(input: &str) -> Result<String, String> {
    if input == "-" {
        use std::io::Read;
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .map_err(|e| format!("failed to read from stdin: {e}"))?;
        Ok(buf)
    } else {
        let path = Path::new(input);
        std::fs::read_to_string(path).map_err(|e| format!("failed to read '{input}': {e}"))
    }
}

fn run(options: &Options) -> Result<(), String> {
    let mut config = Config::load(options.config_path.as_deref()).map_err(|e| e.to_string())?;
    if let Some(dir) = &options.cache_dir {
        config.cache_dir = dir.clone();
    }
    if let Some(b) = options.jit_enabled {
        config.jit_enabled = b;
    }
    if let Some(b) = options.shadow_enabled {
        config.shadow_enabled = b;
    }
    if let Some(b) = options.strict {
        config.strict_divergence = b;
    }

    if options.grammar.is_some() {
        tracing::debug!(
            grammar = ?options.grammar,
            "grammar file accepted for interface compatibility; this core consumes pre-parsed AST"
        );
    }

    let input_path = options
        .input
        .as_deref()
        .ok_or_else(|| "missing input file".to_string())?;
    let raw = read_input(input_path)?;
    let module: Module = serde_json::from_str(&raw).map_err(|e| format!("invalid AST JSON: {e}"))?;

    let engine = if config.jit_enabled {
        let engine = JitEngine::with_system_assembler(&config.cache_dir)
            .map_err(|e| format!("could not start jit engine: {e}"))?;
        Some(Rc::new(RefCell::new(engine)))
    } else {
        None
    };

    let env = build_builtin_env();
    let mut rt = Runtime::new(config, engine);
    eval_module(&module, &env, &mut rt).map_err(|e| e.to_string())?;

    tracing::info!(
        interpreted = rt.shadow_stats.interpreted,
        jit_calls = rt.shadow_stats.jit_calls,
        divergences = rt.shadow_stats.divergences,
        fallbacks = rt.shadow_stats.fallbacks,
        "run finished"
    );
    Ok(())
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let options = match parse_args() {
        Ok(o) => o,
        Err(e) => {
            eprintln!("Error: {e}");
            eprintln!();
            print_usage();
            process::exit(1);
        }
    };

    if let Err(e) = run(&options) {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

//! CLI for inspecting a flat binary through the sparse functional memory.

use std::env;
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};

use func_memory::{AddressLayout, MemoryImage, Segment, CODE_SEGMENT_NAME};
use log::debug;
#[cfg(test)]
use tempfile as _;

const USAGE_TEXT: &str = "\
Usage: memdump <command> [options]

Commands:
  dump <file>                  Print the sparse memory tree
  read <file> <addr> <width>   Print a big-endian value of 1-8 bytes

Options:
  -b, --base <addr>      Load address of the file (default: 0x400000)
  -n, --name <name>      Image name shown in the dump (default: file path)
  -l, --layout <a:s:p:o> Address, set, page and offset widths (default: 32:10:10:12)
  -h, --help             Show this help message

Examples:
  memdump dump program.bin
  memdump read program.bin 0x400000 4 --base 0x400000
";

const DEFAULT_BASE_ADDR: u64 = 0x40_0000;

#[derive(Debug, PartialEq, Eq)]
enum Command {
    Dump(DumpArgs),
    Read(ReadArgs),
}

#[derive(Debug, PartialEq, Eq)]
struct LoadArgs {
    input: PathBuf,
    base: u64,
    name: Option<String>,
    layout: AddressLayout,
}

#[derive(Debug, PartialEq, Eq)]
struct DumpArgs {
    load: LoadArgs,
}

#[derive(Debug, PartialEq, Eq)]
struct ReadArgs {
    load: LoadArgs,
    addr: u64,
    width: u8,
}

#[derive(Debug)]
enum ParseResult {
    Command(Command),
    Help,
}

fn parse_args(args: impl Iterator<Item = OsString>) -> Result<ParseResult, String> {
    let args: Vec<OsString> = args.collect();
    if args.iter().any(|arg| arg == "--help" || arg == "-h") {
        return Ok(ParseResult::Help);
    }

    let mut args = args.into_iter();
    let first = args.next().ok_or_else(|| "missing command".to_string())?;
    let command_str = first.to_string_lossy().to_string();

    match command_str.as_str() {
        "dump" => parse_dump_args(args)
            .map(Command::Dump)
            .map(ParseResult::Command),
        "read" => parse_read_args(args)
            .map(Command::Read)
            .map(ParseResult::Command),
        other => Err(format!("unknown command: {other}")),
    }
}

/// Splits options from positionals shared by every command.
fn parse_load_options(
    mut args: impl Iterator<Item = OsString>,
) -> Result<(Vec<String>, u64, Option<String>, AddressLayout), String> {
    let mut positionals = Vec::new();
    let mut base = DEFAULT_BASE_ADDR;
    let mut name = None;
    let mut layout = AddressLayout::default();

    while let Some(arg) = args.next() {
        if arg == "-b" || arg == "--base" {
            let value = args
                .next()
                .ok_or_else(|| "missing value for --base".to_string())?;
            base = parse_u64(&value.to_string_lossy())?;
            continue;
        }

        if arg == "-n" || arg == "--name" {
            let value = args
                .next()
                .ok_or_else(|| "missing value for --name".to_string())?;
            name = Some(value.to_string_lossy().to_string());
            continue;
        }

        if arg == "-l" || arg == "--layout" {
            let value = args
                .next()
                .ok_or_else(|| "missing value for --layout".to_string())?;
            layout = parse_layout(&value.to_string_lossy())?;
            continue;
        }

        let text = arg.to_string_lossy().to_string();
        if text.starts_with('-') {
            return Err(format!("unknown option: {text}"));
        }
        positionals.push(text);
    }

    Ok((positionals, base, name, layout))
}

fn parse_dump_args(args: impl Iterator<Item = OsString>) -> Result<DumpArgs, String> {
    let (positionals, base, name, layout) = parse_load_options(args)?;
    let mut positionals = positionals.into_iter();
    let input = positionals
        .next()
        .ok_or_else(|| "missing input path".to_string())?;
    if positionals.next().is_some() {
        return Err("multiple input paths provided".to_string());
    }

    Ok(DumpArgs {
        load: LoadArgs {
            input: PathBuf::from(input),
            base,
            name,
            layout,
        },
    })
}

fn parse_read_args(args: impl Iterator<Item = OsString>) -> Result<ReadArgs, String> {
    let (positionals, base, name, layout) = parse_load_options(args)?;
    let [input, addr, width]: [String; 3] = positionals
        .try_into()
        .map_err(|_| "read expects <file> <addr> <width>".to_string())?;

    let width = width
        .parse::<u8>()
        .map_err(|_| format!("invalid width: {width}"))?;

    Ok(ReadArgs {
        load: LoadArgs {
            input: PathBuf::from(input),
            base,
            name,
            layout,
        },
        addr: parse_u64(&addr)?,
        width,
    })
}

/// Parses decimal or `0x`-prefixed hex; `_` separators are allowed in both.
fn parse_u64(text: &str) -> Result<u64, String> {
    let digits = text.replace('_', "");
    let parsed = digits
        .strip_prefix("0x")
        .or_else(|| digits.strip_prefix("0X"))
        .map_or_else(|| digits.parse::<u64>(), |hex| u64::from_str_radix(hex, 16));
    parsed.map_err(|_| format!("invalid number: {text}"))
}

fn parse_layout(text: &str) -> Result<AddressLayout, String> {
    let widths = text
        .split(':')
        .map(|part| {
            part.parse::<u32>()
                .map_err(|_| format!("invalid layout width: {part}"))
        })
        .collect::<Result<Vec<_>, _>>()?;

    match widths.as_slice() {
        [address, set, page, offset] => Ok(AddressLayout::new(*address, *set, *page, *offset)),
        [address, page, offset] => AddressLayout::with_derived_sets(*address, *page, *offset)
            .map_err(|e| e.to_string()),
        _ => Err(format!("layout must be a:s:p:o or a:p:o, got {text}")),
    }
}

fn load_image(args: &LoadArgs) -> Result<MemoryImage, String> {
    let content = fs::read(&args.input)
        .map_err(|e| format!("failed to read {}: {e}", args.input.display()))?;
    debug!(
        "loaded {} bytes from {}",
        content.len(),
        args.input.display()
    );

    let name = args
        .name
        .clone()
        .unwrap_or_else(|| display_name(&args.input));
    let segments = [Segment::new(CODE_SEGMENT_NAME, args.base, content)];
    MemoryImage::new(name, &segments, args.layout).map_err(|e| e.to_string())
}

fn display_name(path: &Path) -> String {
    path.display().to_string()
}

fn report(error: &dyn std::fmt::Display) -> i32 {
    eprintln!("error: {error}");
    1
}

fn run_dump(args: &DumpArgs) -> Result<(), i32> {
    let image = load_image(&args.load).map_err(|e| report(&e))?;

    print!("{}", image.dump(""));
    let layout = image.codec().layout();
    println!(
        "{} pages in {} sets, code starts at {:#x}, layout {}:{}:{}:{}",
        image.space().allocated_pages(),
        image.space().allocated_sets(),
        image.code_start_addr(),
        layout.address_bits,
        layout.set_bits,
        layout.page_bits,
        layout.offset_bits
    );
    Ok(())
}

fn run_read(args: &ReadArgs) -> Result<(), i32> {
    let image = load_image(&args.load).map_err(|e| report(&e))?;
    let value = image.read(args.addr, args.width).map_err(|e| report(&e))?;

    let digits = usize::from(args.width) * 2;
    println!("{:#x}: 0x{value:0digits$x}", args.addr);
    Ok(())
}

fn main() {
    env_logger::init();

    let exit_code = match parse_args(env::args_os().skip(1)) {
        Ok(ParseResult::Help) => {
            println!("{USAGE_TEXT}");
            0
        }
        Ok(ParseResult::Command(Command::Dump(args))) => match run_dump(&args) {
            Ok(()) => 0,
            Err(code) => code,
        },
        Ok(ParseResult::Command(Command::Read(args))) => match run_read(&args) {
            Ok(()) => 0,
            Err(code) => code,
        },
        Err(error) => {
            let code = report(&error);
            eprintln!("{USAGE_TEXT}");
            code
        }
    };

    std::process::exit(exit_code);
}

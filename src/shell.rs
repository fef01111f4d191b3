//! Line-oriented front end for the wizard.

use crate::app::App;
use crate::models::GenerationMode;
use crate::presets::{self, INTENSITY_LEVELS, PERSPECTIVE_OPTIONS, SCENE_OPTIONS};
use crate::state::{Action, AppState, AppStep};
use crate::Result;
use std::fmt::Write as _;
use std::path::PathBuf;
use tokio::io::{AsyncBufReadExt, BufReader};

pub const DEFAULT_COMPARE_POSITION: f32 = 50.0;

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Upload(PathBuf),
    ChangeImage,
    Prompt(String),
    Perspective(Option<String>),
    Scene(Option<String>),
    Intensity(u32),
    Generate,
    Redo,
    Back,
    Reset,
    Select(usize),
    Compare { index: usize, position: f32 },
    Download(usize),
    DownloadAll,
    History,
    Status,
    Options,
    Help,
    Quit,
}

pub const HELP: &str = "\
Commands:
  upload <path>          load an image (Step 1)
  reupload               go back and pick another image
  prompt <text>          describe the modification (Step 2)
  perspective <n|label>  camera angle preset
  scene <n|label>        environment preset
  intensity <0-100|label>
  generate               start generation (Step 3)
  redo                   regenerate with the same task
  back                   return to the description
  select <n>             show details for variant n
  compare <n> [pos]      write a before/after image split at pos% (default 50)
  download <n>           save variant n as JPEG
  download-all           save every variant
  history | status | options | reset | help | quit";

fn parse_index(arg: &str) -> std::result::Result<usize, String> {
    arg.trim()
        .parse::<usize>()
        .ok()
        .filter(|n| *n > 0)
        .ok_or_else(|| format!("Expected a variant number, got '{}'", arg.trim()))
}

pub fn parse_command(line: &str) -> std::result::Result<Command, String> {
    let line = line.trim();
    let (name, arg) = line
        .split_once(char::is_whitespace)
        .map(|(name, arg)| (name, arg.trim()))
        .unwrap_or((line, ""));

    let require_arg = |what: &str| {
        if arg.is_empty() {
            Err(format!("'{}' needs {}", name, what))
        } else {
            Ok(arg)
        }
    };

    match name.to_lowercase().as_str() {
        "upload" => Ok(Command::Upload(PathBuf::from(require_arg("a file path")?))),
        "reupload" => Ok(Command::ChangeImage),
        "prompt" | "describe" => Ok(Command::Prompt(require_arg("a description")?.to_string())),
        "perspective" => presets::resolve_option(PERSPECTIVE_OPTIONS, require_arg("a preset")?)
            .map(Command::Perspective)
            .ok_or_else(|| format!("Unknown perspective '{}'; try 'options'", arg)),
        "scene" => presets::resolve_option(SCENE_OPTIONS, require_arg("a preset")?)
            .map(Command::Scene)
            .ok_or_else(|| format!("Unknown scene '{}'; try 'options'", arg)),
        "intensity" => presets::resolve_intensity(require_arg("a level")?)
            .map(Command::Intensity)
            .ok_or_else(|| format!("Unknown intensity '{}'", arg)),
        "generate" => Ok(Command::Generate),
        "redo" => Ok(Command::Redo),
        "back" | "edit" => Ok(Command::Back),
        "reset" => Ok(Command::Reset),
        "select" => Ok(Command::Select(parse_index(require_arg("a variant number")?)?)),
        "compare" => {
            let mut parts = require_arg("a variant number")?.split_whitespace();
            let index = parse_index(parts.next().unwrap_or_default())?;
            let position = match parts.next() {
                Some(raw) => raw
                    .trim_end_matches('%')
                    .parse::<f32>()
                    .map_err(|_| format!("Expected a split position in percent, got '{}'", raw))?,
                None => DEFAULT_COMPARE_POSITION,
            };
            Ok(Command::Compare { index, position })
        }
        "download" => Ok(Command::Download(parse_index(require_arg("a variant number")?)?)),
        "download-all" => Ok(Command::DownloadAll),
        "history" => Ok(Command::History),
        "status" => Ok(Command::Status),
        "options" => Ok(Command::Options),
        "help" | "?" => Ok(Command::Help),
        "quit" | "exit" => Ok(Command::Quit),
        "" => Err(String::new()),
        other => Err(format!("Unknown command '{}'; type 'help'", other)),
    }
}

pub fn render_state(state: &AppState) -> String {
    let mut out = String::new();
    let steps = [AppStep::Upload, AppStep::Describe, AppStep::Generate];
    let header: Vec<String> = steps
        .iter()
        .map(|step| {
            let marker = if *step <= state.step { "●" } else { "○" };
            format!("{} {}", marker, step.label())
        })
        .collect();
    let _ = writeln!(out, "{}", header.join("  ›  "));

    match state.step {
        AppStep::Upload => {
            let _ = writeln!(out, "第一步：上传您的图片 / Step 1: Upload your image");
        }
        AppStep::Describe | AppStep::Generate => {
            let task = &state.current_task;
            let _ = writeln!(out, "Prompt:      {}", non_empty(&task.prompt));
            let _ = writeln!(
                out,
                "Perspective: {}",
                presets::label_for_value(PERSPECTIVE_OPTIONS, task.perspective_angle.as_deref())
            );
            let _ = writeln!(
                out,
                "Scene:       {}",
                presets::label_for_value(SCENE_OPTIONS, task.scene_type.as_deref())
            );
            let _ = writeln!(
                out,
                "Intensity:   {} ({})",
                task.intensity,
                presets::intensity_label(task.intensity)
            );
        }
    }

    if state.step == AppStep::Generate {
        if state.is_generating {
            let _ = writeln!(out, "Generating {} variants…", GenerationMode::ALL.len());
        } else if !state.results.is_empty() {
            let _ = writeln!(out, "已为您准备好 {} 种路径的写实变体方案。", state.results.len());
        }
        for (i, result) in state.results.iter().enumerate() {
            let selected = if state.selected == Some(result.id) { ">" } else { " " };
            let _ = writeln!(
                out,
                "{} #{} [Path {}] {} - {}",
                selected,
                i + 1,
                result.mode.path_number(),
                result.mode.label(),
                result.mode.description()
            );
        }
    }

    if let Some(result) = state.selected_result() {
        let _ = writeln!(out, "详情 / Details");
        let _ = writeln!(out, "  Mode:   {}", result.mode.as_tag().replace('_', " "));
        let _ = writeln!(out, "  Prompt: \"{}\"", result.prompt_used.trim());
        let _ = writeln!(out, "  Time:   {}", result.timestamp.format("%Y-%m-%d %H:%M:%S UTC"));
    }

    if let Some(notice) = &state.notice {
        let _ = writeln!(out, "Note: {}", notice);
    }
    if let Some(error) = &state.error {
        let _ = writeln!(out, "系统诊断报告 / Diagnostic");
        let _ = writeln!(out, "  {}", error);
        let _ = writeln!(out, "  (type 'back' to edit the prompt)");
    }

    out
}

fn non_empty(text: &str) -> &str {
    if text.trim().is_empty() {
        "(empty)"
    } else {
        text
    }
}

pub fn render_history(state: &AppState) -> String {
    if state.history.is_empty() {
        return "No variants generated yet.".to_string();
    }
    let mut out = String::new();
    for result in &state.history {
        let _ = writeln!(
            out,
            "{}  {:<18} {}",
            result.timestamp.format("%H:%M:%S"),
            result.mode.label(),
            result.id
        );
    }
    out
}

pub fn render_options() -> String {
    let mut out = String::from("Perspective:\n");
    for (i, option) in PERSPECTIVE_OPTIONS.iter().enumerate() {
        let _ = writeln!(out, "  {}. {}", i + 1, option.label);
    }
    out.push_str("Scene:\n");
    for (i, option) in SCENE_OPTIONS.iter().enumerate() {
        let _ = writeln!(out, "  {}. {}", i + 1, option.label);
    }
    out.push_str("Intensity:\n");
    for level in INTENSITY_LEVELS {
        let _ = writeln!(out, "  {} ({})", level.label, level.value);
    }
    out
}

/// Applies one command. Returns `false` when the session should end.
pub async fn execute(app: &mut App, command: Command) -> Result<bool> {
    match command {
        Command::Upload(path) => app.upload_file(&path).await?,
        Command::ChangeImage => app.dispatch(Action::ChangeImage),
        Command::Prompt(text) => app.dispatch(Action::SetPrompt(text)),
        Command::Perspective(value) => app.dispatch(Action::SetPerspective(value)),
        Command::Scene(value) => app.dispatch(Action::SetScene(value)),
        Command::Intensity(value) => app.dispatch(Action::SetIntensity(value)),
        Command::Generate => app.generate()?,
        Command::Redo => app.dispatch(Action::Redo),
        Command::Back => app.dispatch(Action::BackToDescribe),
        Command::Reset => app.dispatch(Action::Reset),
        Command::Select(index) => app.select(index)?,
        Command::Compare { index, position } => {
            let path = app.compare(index, position).await?;
            println!("Saved {}", path.display());
        }
        Command::Download(index) => {
            let path = app.download(index).await?;
            println!("Saved {}", path.display());
        }
        Command::DownloadAll => {
            for path in app.download_all().await? {
                println!("Saved {}", path.display());
            }
        }
        Command::History => print!("{}", render_history(app.state())),
        Command::Status => {}
        Command::Options => print!("{}", render_options()),
        Command::Help => println!("{}", HELP),
        Command::Quit => return Ok(false),
    }
    Ok(true)
}

/// Reads commands from stdin until `quit` or end of input, applying run
/// completions as they arrive.
pub async fn run_interactive(app: &mut App) -> Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    println!("{}", HELP);
    print!("{}", render_state(app.state()));

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                match parse_command(&line) {
                    Ok(command) => {
                        let show_state = !matches!(
                            command,
                            Command::History | Command::Options | Command::Help
                        );
                        match execute(app, command).await {
                            Ok(true) => {}
                            Ok(false) => break,
                            Err(e) => println!("Error: {}", e),
                        }
                        if show_state {
                            print!("{}", render_state(app.state()));
                        }
                    }
                    Err(message) if message.is_empty() => {}
                    Err(message) => println!("{}", message),
                }
            }
            _ = app.poll_generation(), if app.state().is_generating => {
                print!("{}", render_state(app.state()));
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ModificationResult;
    use crate::orchestrator::GenerationOutcome;
    use crate::state::reduce;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_simple_commands() {
        assert_eq!(parse_command("generate"), Ok(Command::Generate));
        assert_eq!(parse_command("  REDO "), Ok(Command::Redo));
        assert_eq!(parse_command("edit"), Ok(Command::Back));
        assert_eq!(parse_command("download-all"), Ok(Command::DownloadAll));
        assert_eq!(parse_command("quit"), Ok(Command::Quit));
    }

    #[test]
    fn test_parse_prompt_keeps_full_text() {
        assert_eq!(
            parse_command("prompt 把背景的枯树枝去掉， 换成春天森林"),
            Ok(Command::Prompt("把背景的枯树枝去掉， 换成春天森林".to_string()))
        );
        assert!(parse_command("prompt").is_err());
    }

    #[test]
    fn test_parse_presets() {
        assert_eq!(
            parse_command("scene tropical beach"),
            Ok(Command::Scene(Some(
                "on a sunny tropical beach with white sand".to_string()
            )))
        );
        assert_eq!(parse_command("perspective 1"), Ok(Command::Perspective(None)));
        assert_eq!(parse_command("intensity extreme"), Ok(Command::Intensity(100)));
        assert!(parse_command("scene atlantis").is_err());
    }

    #[test]
    fn test_parse_indices() {
        assert_eq!(parse_command("download 3"), Ok(Command::Download(3)));
        assert_eq!(
            parse_command("compare 2 30%"),
            Ok(Command::Compare {
                index: 2,
                position: 30.0
            })
        );
        assert_eq!(
            parse_command("compare 1"),
            Ok(Command::Compare {
                index: 1,
                position: DEFAULT_COMPARE_POSITION
            })
        );
        assert!(parse_command("download 0").is_err());
        assert!(parse_command("select two").is_err());
    }

    #[test]
    fn test_parse_unknown_and_blank() {
        assert_eq!(parse_command("   "), Err(String::new()));
        assert!(parse_command("fly").unwrap_err().contains("Unknown command"));
    }

    #[test]
    fn test_render_state_shows_results_and_diagnostic() {
        let mut state = AppState::default();
        reduce(&mut state, Action::Upload("data:image/png;base64,AAAA".to_string()));
        reduce(&mut state, Action::SetPrompt("add snow".to_string()));
        let run = match reduce(&mut state, Action::Generate).pop() {
            Some(crate::state::Effect::StartGeneration { run, .. }) => run,
            other => panic!("unexpected {:?}", other),
        };
        let result = ModificationResult::new(
            "data:image/png;base64,AAAA".to_string(),
            GenerationMode::SceneSwap,
            "add snow".to_string(),
        );
        reduce(
            &mut state,
            Action::GenerationSucceeded {
                run,
                outcome: GenerationOutcome {
                    refined_prompt: "add snow".to_string(),
                    results: vec![result],
                    failures: Vec::new(),
                },
            },
        );
        state.error = Some("【生成异常】boom。建议稍后重试或简化指令。".to_string());

        let rendered = render_state(&state);
        assert!(rendered.contains("#1 [Path 3] Scene Swap"));
        assert!(rendered.contains("Prompt:      add snow"));
        assert!(rendered.contains("系统诊断报告 / Diagnostic"));
    }

    #[test]
    fn test_render_history_empty() {
        assert_eq!(render_history(&AppState::default()), "No variants generated yet.");
    }

    #[test]
    fn test_render_options_lists_presets() {
        let options = render_options();
        assert!(options.contains("Cyberpunk City"));
        assert!(options.contains("Bird's Eye"));
        assert!(options.contains("Extreme (100)"));
    }
}

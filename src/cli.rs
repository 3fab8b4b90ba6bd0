//! Terminal front end: a line-based REPL over a session controller.

use std::io::Result;
use std::sync::Arc;

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, Lines};

use crate::assessment::{
    AppStage, AssessmentReport, Gender, Notifier, PatientProfile, SessionController,
};
use crate::error::SessionError;

/// Prints notifications to stderr.
pub struct TerminalNotifier;

impl Notifier for TerminalNotifier {
    fn notify(&self, message: &str) {
        eprintln!("⚠️  {}", message);
    }
}

/// Drive a session from `input`, writing everything the user sees to
/// `output`. Returns on `/quit` or end of input.
pub async fn run<R, W>(controller: Arc<SessionController>, input: R, output: &mut W) -> Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut lines = input.lines();

    loop {
        match controller.stage().await {
            AppStage::Intake => {
                let Some(profile) = read_intake(&mut lines, output).await? else {
                    break;
                };
                if let Err(e) = controller.submit_intake(profile).await {
                    report_error(output, &e).await?;
                    continue;
                }
                if controller.config().warm_up {
                    match controller.start_interview().await {
                        Ok(greeting) => say(output, &format!("\n{greeting}\n")).await?,
                        Err(e) => report_error(output, &e).await?,
                    }
                } else {
                    let hint = "\nDescribe your symptoms. /done to finish, /reset to start over.\n";
                    say(output, hint).await?;
                }
            }
            AppStage::Interview => {
                let Some(line) = ask(&mut lines, output, "> ").await? else {
                    break;
                };
                match line.as_str() {
                    "/reset" => controller.reset().await,
                    "/done" => {
                        say(output, "⏳ Analyzing symptoms...").await?;
                        match controller.complete_interview().await {
                            Ok(report) => {
                                let profile = controller.profile().await;
                                say(output, &render_report(profile.as_ref(), &report)).await?;
                            }
                            Err(e) => report_error(output, &e).await?,
                        }
                    }
                    "" => {}
                    text => match controller.send_turn(text).await {
                        Ok(reply) => {
                            say(output, &format!("\n{}\n", reply.text)).await?;
                            if controller.is_interview_complete().await {
                                let hint = "The interview is complete. Type /done for your report.";
                                say(output, hint).await?;
                            }
                        }
                        Err(e) => report_error(output, &e).await?,
                    },
                }
            }
            AppStage::Analyzing | AppStage::Report => {
                let Some(line) =
                    ask(&mut lines, output, "Type /reset to start over or /quit to exit: ").await?
                else {
                    break;
                };
                if line == "/reset" {
                    controller.reset().await;
                }
            }
        }
    }

    Ok(())
}

/// Collect a profile field by field. `None` means the user quit.
async fn read_intake<R, W>(lines: &mut Lines<R>, output: &mut W) -> Result<Option<PatientProfile>>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    say(output, "\n── New assessment ──").await?;

    let name = loop {
        let Some(name) = ask(lines, output, "Name: ").await? else {
            return Ok(None);
        };
        if !name.is_empty() {
            break name;
        }
        say(output, "Name is required.").await?;
    };

    let age = loop {
        let Some(raw) = ask(lines, output, "Age: ").await? else {
            return Ok(None);
        };
        match raw.parse::<u32>() {
            Ok(age) if age > 0 => break age,
            _ => say(output, "Please enter a positive whole number.").await?,
        }
    };

    let gender = loop {
        let Some(raw) = ask(lines, output, "Gender (Male/Female/Other): ").await? else {
            return Ok(None);
        };
        match raw.parse::<Gender>() {
            Ok(g) => break g,
            Err(e) => say(output, &e.to_string()).await?,
        }
    };

    let mut profile = PatientProfile::new(name, age, gender);
    let optional: [(&str, &mut Option<String>); 4] = [
        ("Blood group (optional): ", &mut profile.blood_group),
        ("Allergies (optional): ", &mut profile.allergies),
        ("Existing conditions (optional): ", &mut profile.existing_conditions),
        ("Main symptom (optional): ", &mut profile.primary_symptom),
    ];
    for (label, slot) in optional {
        let Some(value) = ask(lines, output, label).await? else {
            return Ok(None);
        };
        *slot = (!value.is_empty()).then_some(value);
    }

    Ok(Some(profile))
}

/// Print a prompt and read one trimmed line. `None` on EOF or `/quit`.
async fn ask<R, W>(lines: &mut Lines<R>, output: &mut W, prompt: &str) -> Result<Option<String>>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    output.write_all(prompt.as_bytes()).await?;
    output.flush().await?;
    Ok(lines
        .next_line()
        .await?
        .map(|line| line.trim().to_string())
        .filter(|line| line != "/quit"))
}

/// Misuse errors are shown inline. Remote failures were already shown by
/// the notifier, so they are not repeated.
async fn report_error<W: AsyncWrite + Unpin>(output: &mut W, err: &SessionError) -> Result<()> {
    if err.is_remote_failure() {
        return Ok(());
    }
    say(output, &format!("❌ {err}")).await
}

async fn say<W: AsyncWrite + Unpin>(output: &mut W, text: &str) -> Result<()> {
    output.write_all(text.as_bytes()).await?;
    output.write_all(b"\n").await?;
    output.flush().await?;
    Ok(())
}

/// Plain-text rendering of a report for the terminal.
pub fn render_report(profile: Option<&PatientProfile>, report: &AssessmentReport) -> String {
    let mut out = vec![String::new(), "══ Assessment Report ══".to_string()];
    if let Some(p) = profile {
        out.push(format!("Patient: {} ({}, {})", p.name, p.age, p.gender));
    }
    out.push(String::new());
    out.push(report.summary().to_string());
    out.push(String::new());
    for (i, c) in report.conditions().iter().enumerate() {
        out.push(format!(
            "{}. {} - {}% [{}]",
            i + 1,
            c.name(),
            c.probability(),
            c.severity()
        ));
        out.push(format!("   Why: {}", c.reasoning()));
        out.push(format!("   Next: {}", c.recommendation()));
    }
    out.push(String::new());
    out.push(format!(
        "Generated {}",
        report.generated_at().format("%Y-%m-%d %H:%M UTC")
    ));
    out.push(report.disclaimer().to_string());
    out.join("\n")
}

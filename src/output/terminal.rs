// Colored terminal output for detector results and dispatch outcomes.
//
// main.rs runs a detector or a dispatch and hands the record here.

use colored::Colorize;

use crate::db::models::AnalysisRecord;
use crate::detectors::{DeepfakeAnalysis, FaceExtraction, FaceMatch, VideoAnalysis};
use crate::moderation::{ImageModeration, TextModeration};
use crate::notify::dispatcher::DispatchResult;

fn verdict(flagged: bool, yes: &str, no: &str) -> colored::ColoredString {
    if flagged {
        yes.red().bold()
    } else {
        no.green()
    }
}

fn print_error(error: &Option<String>) {
    if let Some(e) = error {
        println!("  {} {}", "Error:".yellow().bold(), e);
    }
}

pub fn display_text_moderation(text: &str, result: &TextModeration) {
    println!("\n{}", "=== Text Moderation ===".bold());
    println!("  Text: {}", super::truncate_chars(text, 120).dimmed());
    println!("  Language: {}", result.language);
    if let Some(translated) = &result.translated_text {
        println!("  Translated: {}", super::truncate_chars(translated, 120).dimmed());
    }
    println!(
        "  Verdict: {}  (confidence {:.2})",
        verdict(result.is_toxic, "TOXIC", "clean"),
        result.confidence
    );
    if !result.matched_terms.is_empty() {
        println!("  Blacklisted terms: {}", result.matched_terms.join(", ").red());
    }
    print_error(&result.error);
}

pub fn display_image_moderation(path: &str, result: &ImageModeration) {
    println!("\n{}", "=== Image Moderation ===".bold());
    println!("  File: {}", path);
    println!(
        "  Verdict: {}  (nsfw score {:.2})",
        verdict(result.is_explicit, "EXPLICIT", "safe"),
        result.confidence
    );
    print_error(&result.error);
}

pub fn display_deepfake(path: &str, result: &DeepfakeAnalysis) {
    println!("\n{}", "=== Deepfake Analysis ===".bold());
    println!("  File: {}", path);
    println!(
        "  Verdict: {}  (confidence {:.2}, manipulation {:.2})",
        verdict(result.is_deepfake, "MANIPULATED", "authentic"),
        result.confidence,
        result.manipulation_score
    );
    if !result.facial_inconsistencies.is_empty() {
        println!(
            "  Inconsistencies: {}",
            result.facial_inconsistencies.join(", ").yellow()
        );
    }
    print_error(&result.error);
}

pub fn display_video(path: &str, result: &VideoAnalysis) {
    println!("\n{}", "=== Video Deepfake Analysis ===".bold());
    println!("  File: {}", path);
    println!(
        "  Verdict: {}  (confidence {:.2})",
        verdict(result.is_deepfake, "MANIPULATED", "authentic"),
        result.confidence
    );
    let flagged_frames = result.frame_analysis.iter().filter(|f| f.is_deepfake).count();
    println!(
        "  Frames: {} analyzed, {} flagged  |  Temporal consistency: {:.2}",
        result.frame_analysis.len(),
        flagged_frames,
        result.temporal_consistency
    );
    print_error(&result.error);
}

pub fn display_face_match(result: &FaceMatch) {
    println!("\n{}", "=== Face Verification ===".bold());
    let outcome = if result.matched {
        "MATCH".green().bold()
    } else {
        "no match".yellow()
    };
    println!(
        "  Result: {}  (similarity {:.2}, confidence {:.2})",
        outcome, result.similarity, result.confidence
    );
    print_error(&result.error);
}

pub fn display_face_extraction(path: &str, result: &FaceExtraction) {
    println!("\n{}", "=== Face Extraction ===".bold());
    println!("  File: {}", path);
    match &result.face_data {
        Some(face) => {
            let [x, y, w, h] = face.bbox;
            println!("  Face at ({x}, {y}) size {w}x{h}");
            for (name, [lx, ly]) in &face.landmarks {
                println!("    {name}: ({lx}, {ly})");
            }
        }
        None => println!("  {}", "No face found".yellow()),
    }
    print_error(&result.error);
}

pub fn display_dispatch(user_id: &str, result: &DispatchResult) {
    println!("\n{}", format!("=== Notification to {} ===", user_id).bold());
    for (channel, delivered) in &result.channels {
        let mark = if *delivered {
            "delivered".green()
        } else {
            "failed".red()
        };
        println!("  {:<18} {}", channel.as_str(), mark);
    }
    if !result.delivered_anywhere() {
        println!("  {}", "No channel reached the user.".yellow());
    }
}

pub fn display_recent_analyses(analyses: &[AnalysisRecord]) {
    if analyses.is_empty() {
        println!("Recent analyses: none yet");
        return;
    }
    println!("Recent analyses ({}):", analyses.len());
    for a in analyses {
        let flag = if a.flagged { "flagged".red() } else { "ok".green() };
        println!(
            "  {:<18} {:<8} {:.2}  {}  ({})",
            a.kind,
            flag,
            a.confidence,
            super::truncate_chars(&a.subject, 50).dimmed(),
            a.created_at
        );
    }
}

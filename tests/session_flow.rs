//! End-to-end session behaviour against a scripted model.

mod common;

use common::{ScriptedLlm, Step, asha_report, condition, controller, reply, report};
use swasthya_scan::assessment::{
    AppStage, Gender, INTERVIEW_FAILURE_MESSAGE, PatientProfile, REPORT_FAILURE_MESSAGE, Severity,
    Speaker,
};
use swasthya_scan::config::AssessmentConfig;
use swasthya_scan::error::SessionError;
use swasthya_scan::llm::Role;

fn asha() -> PatientProfile {
    PatientProfile::new("Asha", 29, Gender::Female)
}

#[tokio::test]
async fn intake_moves_to_interview_and_stores_profile_exactly() {
    let profiles = [
        asha(),
        PatientProfile {
            blood_group: Some("B-".into()),
            allergies: Some("penicillin".into()),
            existing_conditions: Some("type 2 diabetes".into()),
            primary_symptom: Some("chest tightness".into()),
            ..PatientProfile::new("Ravi Kumar", 61, Gender::Male)
        },
        PatientProfile::new("Sam", 1, Gender::Other),
    ];

    for profile in profiles {
        let (ctrl, _) = controller(ScriptedLlm::new(vec![]), AssessmentConfig::default());
        ctrl.submit_intake(profile.clone()).await.unwrap();
        assert_eq!(ctrl.stage().await, AppStage::Interview);
        assert_eq!(ctrl.profile().await, Some(profile));
    }
}

#[tokio::test]
async fn n_turns_give_2n_alternating_messages() {
    let n = 5;
    let steps = (0..n).map(|i| reply(&format!("question {i}"), false)).collect();
    let (ctrl, _) = controller(ScriptedLlm::new(steps), AssessmentConfig::default());
    ctrl.submit_intake(asha()).await.unwrap();

    for i in 0..n {
        ctrl.send_turn(&format!("answer {i}")).await.unwrap();
        let transcript = ctrl.transcript().await;
        assert_eq!(transcript.len(), 2 * (i + 1));
    }

    let transcript = ctrl.transcript().await;
    for (i, message) in transcript.iter().enumerate() {
        let expected = if i % 2 == 0 { Speaker::User } else { Speaker::Model };
        assert_eq!(message.role, expected, "message {i}");
    }
    assert_eq!(transcript.messages()[0].text, "answer 0");
    assert_eq!(transcript.messages()[9].text, "question 4");
}

#[tokio::test]
async fn scenario_a_successful_assessment() {
    let llm = ScriptedLlm::new(vec![
        reply("How long have you had the fever?", false),
        asha_report(),
    ]);
    let (ctrl, notifier) = controller(llm.clone(), AssessmentConfig::default());

    ctrl.submit_intake(asha()).await.unwrap();
    assert_eq!(ctrl.stage().await, AppStage::Interview);

    ctrl.send_turn("I have a headache and fever").await.unwrap();
    let transcript = ctrl.transcript().await;
    assert_eq!(transcript.len(), 2);
    assert_eq!(transcript.messages()[1].role, Speaker::Model);

    let report = ctrl.complete_interview().await.unwrap();
    assert_eq!(ctrl.stage().await, AppStage::Report);
    assert_eq!(report.conditions().len(), 2);
    assert_eq!(report.conditions()[0].name(), "Viral Fever");
    assert_eq!(report.conditions()[0].probability(), 70);
    assert_eq!(report.conditions()[0].severity(), Severity::Medium);
    assert_eq!(report.conditions()[1].name(), "Migraine");
    assert_eq!(report.conditions()[1].severity(), Severity::Low);
    assert!(report.conditions().iter().all(|c| c.probability() <= 100));
    assert!(!report.disclaimer().is_empty());
    assert_eq!(ctrl.report().await, Some(report));
    assert!(notifier.is_empty());

    // The report request carries both the profile and the transcript.
    let requests = llm.requests();
    let report_prompt = &requests[1].messages.last().unwrap();
    assert_eq!(report_prompt.role, Role::User);
    assert!(report_prompt.content.contains("Asha"));
    assert!(report_prompt.content.contains("Patient: I have a headache and fever"));
    assert!(requests[1].json_output);
}

#[tokio::test]
async fn scenario_b_report_call_fails() {
    let llm = ScriptedLlm::new(vec![reply("Any other symptoms?", false), Step::Fail]);
    let (ctrl, notifier) = controller(llm, AssessmentConfig::default());

    ctrl.submit_intake(asha()).await.unwrap();
    ctrl.send_turn("I have a headache and fever").await.unwrap();

    let err = ctrl.complete_interview().await.unwrap_err();
    assert!(matches!(err, SessionError::RemoteUnavailable(_)));

    assert_eq!(ctrl.stage().await, AppStage::Intake);
    assert!(ctrl.profile().await.is_none());
    assert!(ctrl.report().await.is_none());
    assert!(ctrl.transcript().await.is_empty());
    assert_eq!(notifier.drain(), vec![REPORT_FAILURE_MESSAGE.to_string()]);
}

#[tokio::test]
async fn scenario_c_out_of_range_probability() {
    let llm = ScriptedLlm::new(vec![
        reply("Any other symptoms?", false),
        report(vec![
            condition("Viral Fever", 150, "Medium"),
            condition("Migraine", 30, "Low"),
        ]),
    ]);
    let (ctrl, notifier) = controller(llm, AssessmentConfig::default());

    ctrl.submit_intake(asha()).await.unwrap();
    ctrl.send_turn("I have a headache and fever").await.unwrap();

    let err = ctrl.complete_interview().await.unwrap_err();
    assert!(matches!(err, SessionError::MalformedReport { .. }));

    assert_eq!(ctrl.stage().await, AppStage::Intake);
    assert!(ctrl.profile().await.is_none());
    assert!(ctrl.report().await.is_none());
    assert_eq!(notifier.drain(), vec![REPORT_FAILURE_MESSAGE.to_string()]);
}

#[tokio::test]
async fn empty_conditions_fail_like_a_remote_error() {
    let llm = ScriptedLlm::new(vec![report(vec![])]);
    let (ctrl, notifier) = controller(llm, AssessmentConfig::default());
    ctrl.submit_intake(asha()).await.unwrap();

    let err = ctrl.complete_interview().await.unwrap_err();
    assert!(matches!(err, SessionError::MalformedReport { .. }));
    assert_eq!(ctrl.stage().await, AppStage::Intake);
    assert_eq!(notifier.len(), 1);
}

#[tokio::test]
async fn failed_turn_resets_the_session() {
    let llm = ScriptedLlm::new(vec![reply("Since when?", false), Step::Fail]);
    let (ctrl, notifier) = controller(llm, AssessmentConfig::default());
    ctrl.submit_intake(asha()).await.unwrap();
    ctrl.send_turn("headache").await.unwrap();

    let err = ctrl.send_turn("three days").await.unwrap_err();
    assert!(matches!(err, SessionError::RemoteUnavailable(_)));
    assert_eq!(ctrl.stage().await, AppStage::Intake);
    assert!(ctrl.transcript().await.is_empty());
    assert_eq!(notifier.drain(), vec![INTERVIEW_FAILURE_MESSAGE.to_string()]);
}

#[tokio::test]
async fn reset_from_report_clears_everything() {
    let llm = ScriptedLlm::new(vec![reply("ok", true), asha_report()]);
    let (ctrl, _) = controller(llm, AssessmentConfig::default());
    ctrl.submit_intake(asha()).await.unwrap();
    ctrl.send_turn("fever").await.unwrap();
    ctrl.complete_interview().await.unwrap();
    assert_eq!(ctrl.stage().await, AppStage::Report);

    ctrl.reset().await;
    assert_eq!(ctrl.stage().await, AppStage::Intake);
    assert!(ctrl.profile().await.is_none());
    assert!(ctrl.report().await.is_none());
    assert!(ctrl.transcript().await.is_empty());
}

#[tokio::test]
async fn reset_is_idempotent() {
    let llm = ScriptedLlm::new(vec![reply("Since when?", false)]);
    let (ctrl, _) = controller(llm, AssessmentConfig::default());
    ctrl.submit_intake(asha()).await.unwrap();
    ctrl.send_turn("cough").await.unwrap();

    ctrl.reset().await;
    let once = serde_json::to_value(ctrl.snapshot().await).unwrap();
    ctrl.reset().await;
    let twice = serde_json::to_value(ctrl.snapshot().await).unwrap();

    assert_eq!(once, twice);
    assert_eq!(once["stage"], "INTAKE");
    assert!(once["profile"].is_null());
    assert!(once["report"].is_null());
    assert_eq!(once["transcript"], serde_json::json!([]));
}

#[tokio::test]
async fn session_can_restart_after_failure() {
    let llm = ScriptedLlm::new(vec![Step::Fail, reply("What brings you in?", false)]);
    let (ctrl, _) = controller(llm, AssessmentConfig::default());
    ctrl.submit_intake(asha()).await.unwrap();
    assert!(ctrl.send_turn("fever").await.is_err());

    ctrl.submit_intake(asha()).await.unwrap();
    let reply = ctrl.send_turn("fever").await.unwrap();
    assert_eq!(reply.text, "What brings you in?");
    assert_eq!(ctrl.transcript().await.len(), 2);
}

#[tokio::test]
async fn completion_is_reported_and_further_turns_refused() {
    let llm = ScriptedLlm::new(vec![reply("Thanks, I have enough.", true)]);
    let (ctrl, _) = controller(llm, AssessmentConfig::default());
    ctrl.submit_intake(asha()).await.unwrap();
    assert!(!ctrl.is_interview_complete().await);

    ctrl.send_turn("fever and chills").await.unwrap();
    assert!(ctrl.is_interview_complete().await);

    let err = ctrl.send_turn("one more thing").await.unwrap_err();
    assert!(matches!(err, SessionError::InterviewComplete));
    assert_eq!(ctrl.stage().await, AppStage::Interview);
}

#[tokio::test]
async fn free_text_marker_declares_completion() {
    let llm = ScriptedLlm::new(vec![Step::Reply(
        "Thank you, that's all I need.\n[INTERVIEW_COMPLETE]".to_string(),
    )]);
    let (ctrl, _) = controller(llm, AssessmentConfig::default());
    ctrl.submit_intake(asha()).await.unwrap();

    let reply = ctrl.send_turn("rash on both arms").await.unwrap();
    assert_eq!(reply.text, "Thank you, that's all I need.");
    assert!(ctrl.is_interview_complete().await);
}

#[tokio::test]
async fn configured_turn_cap_completes_interview() {
    let llm = ScriptedLlm::new(vec![reply("q1", false), reply("q2", false)]);
    let config = AssessmentConfig {
        max_turns: Some(2),
        ..Default::default()
    };
    let (ctrl, _) = controller(llm, config);
    ctrl.submit_intake(asha()).await.unwrap();

    ctrl.send_turn("a1").await.unwrap();
    assert!(!ctrl.is_interview_complete().await);
    ctrl.send_turn("a2").await.unwrap();
    assert!(ctrl.is_interview_complete().await);
}

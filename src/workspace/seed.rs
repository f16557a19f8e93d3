//! Built-in sample data loaded on first run, when nothing has been saved yet.

use crate::models::{
    DiagnosisResult, FaultDiagnosis, Feedback, FeedbackRating, KnowledgeEntry, ProcessingStatus,
    Severity,
};

const DAY_MS: i64 = 86_400_000;

pub fn sample_knowledge() -> Vec<KnowledgeEntry> {
    vec![
        KnowledgeEntry {
            id: "kb-1".into(),
            product_name: "手持无线吸尘器".into(),
            fault_type: "吸力明显减弱".into(),
            cause: "滤网堵塞或电机进风口阻塞".into(),
            location: "HEPA 滤网组件".into(),
            solution: "清洗或更换 HEPA 滤网，检查吸嘴是否有异物堵塞。".into(),
        },
        KnowledgeEntry {
            id: "kb-2".into(),
            product_name: "车载充气泵".into(),
            fault_type: "充气缓慢且噪音大".into(),
            cause: "气缸密封圈磨损".into(),
            location: "内部压缩气缸".into(),
            solution: "检查润滑油，必要时更换压缩组件。".into(),
        },
    ]
}

/// One processed case, dated two days before `now_ms`.
pub fn sample_history(now_ms: i64) -> Vec<FaultDiagnosis> {
    vec![FaultDiagnosis {
        id: "csa-001".into(),
        timestamp: now_ms - DAY_MS * 2,
        product_name: "高压洗车器".into(),
        category: "洗车器".into(),
        description: "开机后水压非常小，伴随异常抖动。".into(),
        source_region: "江苏省".into(),
        remark: Some("客户反馈在野外露营时使用，环境沙尘较大。".into()),
        status: ProcessingStatus::Processed,
        tracking_number: Some("SF1234567890".into()),
        image_url: None,
        result: DiagnosisResult {
            fault_issue: "压力泵密封阀磨损导致水压泄露".into(),
            confidence: 0.88,
            severity: Severity::Medium,
            reasoning: "江苏省近期湿度较高，且客户提及沙尘环境，可能导致密封件被细微颗粒磨损或因潮湿产生水垢堵塞阀口。".into(),
            suggested_actions: vec![
                "检查进水过滤网是否堵塞。".into(),
                "检查进水管接口是否漏气。".into(),
                "清理压力泵出口阀门。".into(),
            ],
            estimated_repair_cost: String::new(),
        },
        actual_result: Some("进水滤网严重堵塞".into()),
        feedback: Some(Feedback {
            rating: FeedbackRating::Helpful,
            comment: Some("清理了滤网后恢复了。".into()),
        }),
    }]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn knowledge_pairs_are_unique() {
        let kb = sample_knowledge();
        assert_eq!(kb.len(), 2);
        assert!(!kb[0].same_pair(&kb[1]));
    }

    #[test]
    fn sample_case_is_two_days_old() {
        let history = sample_history(10 * DAY_MS);
        assert_eq!(history[0].timestamp, 8 * DAY_MS);
        assert!(!history[0].is_manual());
    }
}

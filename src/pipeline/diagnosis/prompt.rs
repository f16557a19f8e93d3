use serde_json::json;

use super::types::{AnalysisRequest, ImageData, RetrievedContext};

pub const ANALYSIS_ROLE: &str = "你是一个顶级的产品失效分析工程师。请对以下产品故障进行深度分析。";

pub const ANALYSIS_RULES: &str = r#"要求：
1. 首先判断输入信息是否有效。如果输入是乱码、与产品故障无关、或者描述过于模糊（如只写了“坏了”而没有任何现象）导致无法进行逻辑推演，请将 isInformationValid 设为 false，并在 invalidReason 中说明原因。
2. 若信息有效，结合省份地理气候特征（如高盐雾、极端低温、风沙等）给出详细的故障分析结论。结论应侧重于描述“可能出现的问题/故障性质”。
3. 分析逻辑必须包含物理失效路径的推演。"#;

/// Build the outbound analysis request for one candidate diagnosis.
///
/// Pure assembly: no I/O. `region` is expected to be normalized already.
pub fn build_analysis_request(
    product_name: &str,
    category: &str,
    region: &str,
    description: &str,
    context: &RetrievedContext<'_>,
    image: Option<&ImageData>,
) -> AnalysisRequest {
    AnalysisRequest {
        prompt: build_analysis_prompt(product_name, category, region, description, context),
        image: image.cloned(),
        response_schema: analysis_response_schema(),
    }
}

/// The natural-language instruction block with reference data appended.
pub fn build_analysis_prompt(
    product_name: &str,
    category: &str,
    region: &str,
    description: &str,
    context: &RetrievedContext<'_>,
) -> String {
    let mut prompt = String::new();

    prompt.push_str(ANALYSIS_ROLE);
    prompt.push_str("\n\n");
    prompt.push_str(&format!("产品: {product_name} ({category})\n"));
    prompt.push_str(&format!("地域环境: {region}\n"));
    prompt.push_str(&format!("故障现象: {description}\n\n"));
    prompt.push_str(ANALYSIS_RULES);
    prompt.push_str("\n\n");

    let history_json = serde_json::to_string(&context.history).unwrap_or_else(|_| "[]".into());
    let knowledge_json =
        serde_json::to_string(&context.knowledge).unwrap_or_else(|_| "[]".into());

    prompt.push_str(&format!("参考历史: {history_json}\n"));
    prompt.push_str(&format!("参考专家库: {knowledge_json}"));

    prompt
}

/// Expected reply shape, in the generative-language API's schema dialect.
///
/// Only `isInformationValid` is required by the service; the remaining fields
/// are enforced by `parse_analysis_reply` once the input is judged valid.
pub fn analysis_response_schema() -> serde_json::Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "isInformationValid": {
                "type": "BOOLEAN",
                "description": "输入信息是否足以进行故障分析"
            },
            "invalidReason": {
                "type": "STRING",
                "description": "如果信息无效，说明原因"
            },
            "faultIssue": {
                "type": "STRING",
                "description": "可能出现的问题描述，如‘压力泵密封圈磨损导致内漏’"
            },
            "confidence": { "type": "NUMBER" },
            "severity": {
                "type": "STRING",
                "enum": ["Low", "Medium", "High", "Critical"]
            },
            "reasoning": { "type": "STRING" },
            "suggestedActions": {
                "type": "ARRAY",
                "items": { "type": "STRING" }
            }
        },
        "required": ["isInformationValid"]
    })
}

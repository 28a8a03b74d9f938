//! Prompt templates for the four stages.
//!
//! Wording is backend-neutral; each backend renders `system` and the JSON hint itself.

use crate::model::{Chunk, DraftTestcase, Taxonomy};
use crate::providers::oracle::Prompt;

pub(crate) const FILTER_SYSTEM: &str = "게임 테스트케이스 생성에 유용한 문장을 판별합니다.";
pub(crate) const TAXONOMY_SYSTEM: &str =
    "게임 기획서의 구조를 분석하여 대분류/중분류/소분류를 JSON 형식으로 제공합니다.";
pub(crate) const SYNTH_SYSTEM: &str = "게임 기획서 내용으로부터 테스트케이스를 생성합니다.";
pub(crate) const VALIDATE_SYSTEM: &str = "테스트케이스의 품질을 평가합니다.";

/// Number of medium/minor entries quoted in the synthesis prompt.
const STRUCTURE_SAMPLE: usize = 3;

pub(crate) fn relevance(content: &str) -> Prompt {
    let user = format!(
        "다음 문장이 게임 테스트케이스 생성에 유용한지 판단해주세요.\n\
         테스트케이스란 소프트웨어 기능을 검증하기 위한 특정 조건, 입력값, 예상 결과를 포함한 시나리오입니다.\n\n\
         문장이 다음과 같은 내용을 포함한다면 유용합니다:\n\
         - 기능 설명 (사용자가 할 수 있는 행동)\n\
         - 게임 시스템 동작 방식\n\
         - 게임 내 조건과 결과\n\
         - 오류 상황과 예외 처리\n\n\
         다음 문장은 유용합니까? 예/아니오로만 대답해주세요.\n\n\
         문장: {}",
        content
    );
    Prompt::text(user).with_system(FILTER_SYSTEM)
}

pub(crate) fn taxonomy(full_text: &str) -> Prompt {
    let user = format!(
        "다음 게임 기획서 내용을 분석해서 대분류/중분류/소분류 체계를 식별해주세요.\n\
         이 분류체계는 테스트케이스를 구성하는 데 사용될 것입니다.\n\n\
         예시 형식:\n\
         {{\n\
           \"대분류\": [\"시스템\", \"게임플레이\", \"UI\", \"네트워크\", ...],\n\
           \"중분류\": {{\n\
             \"시스템\": [\"로그인\", \"회원가입\", \"캐릭터 생성\", ...],\n\
             \"게임플레이\": [\"전투\", \"퀘스트\", \"인벤토리\", ...],\n\
             ...\n\
           }},\n\
           \"소분류\": {{\n\
             \"로그인\": [\"성공 케이스\", \"실패 케이스\", \"오류 메시지\", ...],\n\
             \"전투\": [\"공격\", \"방어\", \"스킬 사용\", ...],\n\
             ...\n\
           }}\n\
         }}\n\n\
         문서 내용:\n{}\n\n\
         JSON 형식으로만 응답해주세요.",
        full_text
    );
    Prompt::json(user).with_system(TAXONOMY_SYSTEM)
}

/// Structure summary quoted in the synthesis prompt: all majors, then the first
/// three medium and minor entries as `key: a, b`.
pub(crate) fn structure_summary(taxonomy: &Taxonomy) -> String {
    fn sample<'a>(entries: impl Iterator<Item = (&'a String, &'a Vec<String>)>) -> String {
        entries
            .take(STRUCTURE_SAMPLE)
            .map(|(key, items)| format!("{}: {}", key, items.join(", ")))
            .collect::<Vec<_>>()
            .join(", ")
    }

    format!(
        "대분류 옵션: {}\n\n중분류 예시:\n{}\n\n소분류 예시:\n{}",
        taxonomy.majors.join(", "),
        sample(taxonomy.mediums.iter()),
        sample(taxonomy.minors.iter()),
    )
}

pub(crate) fn synthesis(taxonomy: &Taxonomy, batch: &[Chunk]) -> Prompt {
    let batch_text = batch
        .iter()
        .map(|c| c.text.as_str())
        .collect::<Vec<_>>()
        .join("\n");
    let user = format!(
        "다음 게임 기획서 내용을 바탕으로 테스트케이스를 생성해주세요.\n\n\
         문서 구조:\n{}\n\n\
         테스트케이스 양식:\n\
         {{\n\
             \"대분류\": \"대분류명\",\n\
             \"중분류\": \"중분류명\",\n\
             \"소분류\": \"소분류명\",\n\
             \"구분\": \"정상/예외/경계\",\n\
             \"테스트 내용\": \"테스트할 기능이나 동작의 요약\",\n\
             \"테스트 조건\": \"테스트를 수행하기 위한 전제 조건\",\n\
             \"기대 결과\": \"테스트 성공 시 예상되는 결과\",\n\
             \"비고\": \"추가 참고사항\"\n\
         }}\n\n\
         분석할 기획서 내용:\n{}\n\n\
         각 문장마다 관련 테스트케이스를 1-3개 생성해주세요.\n\
         JSON 배열 형식으로 응답해주세요. 객체로 감싸야 한다면 \"testcases\" 키에 배열을 넣어주세요.",
        structure_summary(taxonomy),
        batch_text
    );
    Prompt::json(user).with_system(SYNTH_SYSTEM)
}

pub(crate) fn quality(draft: &DraftTestcase) -> Prompt {
    let tc_text = format!(
        "대분류: {}\n중분류: {}\n소분류: {}\n구분: {}\n테스트 내용: {}\n테스트 조건: {}\n기대 결과: {}\n비고: {}",
        draft.major,
        draft.medium,
        draft.minor,
        draft.kind.label(),
        draft.description,
        draft.precondition,
        draft.expected_result,
        draft.notes
    );
    let user = format!(
        "다음 테스트케이스의 품질을 평가해주세요. 각 항목별로 점수를 부여하고 총점을 계산해주세요.\n\n\
         평가 항목:\n\
         1. 정확성 (40점): 테스트 내용이 명확하고 테스트 조건과 기대 결과가 정확하게 매칭되는가?\n\
         2. 명확성 (20점): 테스트케이스가 이해하기 쉽고 명확하게 작성되었는가?\n\
         3. 중복성 (20점): 다른 테스트케이스와 중복되지 않고 고유한 가치를 제공하는가?\n\
         4. 완전성 (20점): 테스트케이스가 필요한 모든 정보를 포함하고 있는가?\n\n\
         테스트케이스:\n{}\n\n\
         각 항목의 점수와 총점(100점 만점)만 JSON 형식으로 응답해주세요:\n\
         {{\n\
             \"정확성\": 점수,\n\
             \"명확성\": 점수,\n\
             \"중복성\": 점수,\n\
             \"완전성\": 점수,\n\
             \"총점\": 총합점수\n\
         }}",
        tc_text
    );
    Prompt::json(user).with_system(VALIDATE_SYSTEM)
}

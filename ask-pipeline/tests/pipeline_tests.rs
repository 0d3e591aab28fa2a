use std::sync::{Arc, Mutex};
use std::time::Duration;

use ai_llm_service::{
    AiLlmError, CompletionProvider, LlmProvider, ProviderError, ProviderErrorKind,
    ProviderRegistry,
};
use ask_pipeline::{
    AskInput, AskPipeline, ConversationTurn, GateRejection, MemorySink, PipelineConfig,
    PipelineError, Stage,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::{Value, json};
use student_store::{PgStore, RowSource, StoreConfig, StoreError};

type Reply = Box<dyn Fn(&str) -> Result<String, AiLlmError> + Send + Sync>;

/// Answers the query prompt with `sql_reply` and the answer prompt with
/// a canned text that echoes the data section.
struct ScriptedLlm {
    id: LlmProvider,
    query_reply: Reply,
    answer_reply: Reply,
    delay: Option<Duration>,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedLlm {
    fn new(id: LlmProvider, sql: &'static str, answer: &'static str) -> Self {
        Self {
            id,
            query_reply: Box::new(move |_: &str| Ok(sql.to_string())),
            answer_reply: Box::new(move |_: &str| Ok(answer.to_string())),
            delay: None,
            prompts: Mutex::new(Vec::new()),
        }
    }

    fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl CompletionProvider for ScriptedLlm {
    fn provider(&self) -> LlmProvider {
        self.id
    }

    async fn complete(&self, prompt: &str) -> Result<String, AiLlmError> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        if let Some(d) = self.delay {
            tokio::time::sleep(d).await;
        }
        if prompt.contains("TEACHER QUESTION:") && prompt.contains("DATABASE AI-EXTRACTED DATA")
        {
            (self.answer_reply)(prompt)
        } else {
            (self.query_reply)(prompt)
        }
    }
}

#[derive(Default)]
struct FakeStore {
    rows: Vec<Value>,
    fail: bool,
    calls: Mutex<Vec<String>>,
}

impl FakeStore {
    fn with_rows(rows: Vec<Value>) -> Self {
        Self {
            rows,
            ..Default::default()
        }
    }

    fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl RowSource for FakeStore {
    async fn fetch_rows(&self, sql: &str) -> student_store::Result<Vec<Value>> {
        self.calls.lock().unwrap().push(sql.to_string());
        if self.fail {
            return Err(StoreError::Decode("relation \"ejercicio\" does not exist".into()));
        }
        Ok(self.rows.clone())
    }

    async fn ping(&self) -> student_store::Result<DateTime<Utc>> {
        Ok(Utc::now())
    }
}

struct Harness {
    pipeline: AskPipeline,
    llm: Arc<ScriptedLlm>,
    store: Arc<FakeStore>,
    sink: Arc<MemorySink>,
}

fn harness(llm: ScriptedLlm, store: FakeStore, cfg: PipelineConfig) -> Harness {
    let llm = Arc::new(llm);
    let store = Arc::new(store);
    let sink = Arc::new(MemorySink::new());
    let registry = ProviderRegistry::from_providers(
        vec![llm.clone() as Arc<dyn CompletionProvider>],
        LlmProvider::Gemini,
    )
    .unwrap();
    let pipeline = AskPipeline::new(
        Arc::new(registry),
        store.clone(),
        sink.clone(),
        cfg,
    );
    Harness {
        pipeline,
        llm,
        store,
        sink,
    }
}

fn input(question: &str, history: Vec<ConversationTurn>) -> AskInput {
    AskInput {
        question: question.to_string(),
        student_id: Some(7),
        student_name: "Lucía".to_string(),
        model: Some(LlmProvider::Gemini),
        history,
    }
}

#[tokio::test]
async fn answers_with_retrieved_rows() {
    let h = harness(
        ScriptedLlm::new(
            LlmProvider::Gemini,
            "```sql\nSELECT AVG(aciertos) AS media FROM ejercicios WHERE id_alumno = 7;\n```",
            "Lucía acierta de media 8,5 ejercicios.",
        ),
        FakeStore::with_rows(vec![json!({"media": 8.5})]),
        PipelineConfig::default(),
    );

    let answer = h
        .pipeline
        .answer(input("¿Cuántos aciertos tiene de media?", vec![]))
        .await
        .unwrap();

    assert_eq!(answer, "Lucía acierta de media 8,5 ejercicios.");
    assert_eq!(
        h.store.calls(),
        vec!["SELECT AVG(aciertos) AS media FROM ejercicios WHERE id_alumno = 7;"]
    );
    let prompts = h.llm.prompts();
    assert_eq!(prompts.len(), 2);
    assert!(prompts[0].contains("WHERE id_alumno = 7 (this is the id of Lucía)"));
    assert!(prompts[1].contains("[{\"media\":8.5}]"));
}

#[tokio::test]
async fn unnecessary_skips_the_database() {
    let h = harness(
        ScriptedLlm::new(
            LlmProvider::Gemini,
            "unnecessary",
            "Use short, structured tasks.",
        ),
        FakeStore::default(),
        PipelineConfig::default(),
    );

    let answer = h
        .pipeline
        .answer(input("Give me general tips for ADHD students", vec![]))
        .await
        .unwrap();

    assert_eq!(answer, "Use short, structured tasks.");
    assert!(h.store.calls().is_empty());
    let prompts = h.llm.prompts();
    assert!(prompts[1].trim_end().ends_with(": false"));
}

#[tokio::test]
async fn destructive_query_is_rejected_before_the_store() {
    let h = harness(
        ScriptedLlm::new(
            LlmProvider::Gemini,
            "DROP TABLE ejercicios; SELECT 1",
            "never",
        ),
        FakeStore::default(),
        PipelineConfig::default(),
    );

    let err = h
        .pipeline
        .answer(input("Delete everything", vec![]))
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        PipelineError::UnsafeQuery(GateRejection::ForbiddenKeyword(ref k)) if k == "DROP"
    ));
    assert!(h.store.calls().is_empty());
    // The answer step never ran.
    assert_eq!(h.llm.prompts().len(), 1);
    assert!(h.sink.contains("UnsafeQueryError"));
}

#[tokio::test]
async fn store_failure_is_reported_and_logged() {
    let h = harness(
        ScriptedLlm::new(LlmProvider::Gemini, "SELECT * FROM ejercicio", "never"),
        FakeStore {
            fail: true,
            ..Default::default()
        },
        PipelineConfig::default(),
    );

    let err = h
        .pipeline
        .answer(input("¿Cómo va?", vec![]))
        .await
        .unwrap_err();

    assert!(matches!(err, PipelineError::Store(_)));
    assert!(h.sink.contains("StoreError"));
    assert_eq!(h.llm.prompts().len(), 1);
}

#[tokio::test]
async fn provider_failure_maps_to_provider_error() {
    let mut llm = ScriptedLlm::new(LlmProvider::Gemini, "", "");
    llm.query_reply = Box::new(|_: &str| {
        Err(ProviderError::new(LlmProvider::Gemini, ProviderErrorKind::EmptyChoices).into())
    });
    let h = harness(llm, FakeStore::default(), PipelineConfig::default());

    let err = h
        .pipeline
        .answer(input("¿Cómo va?", vec![]))
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        PipelineError::Provider {
            stage: Stage::QueryGeneration,
            ..
        }
    ));
}

#[tokio::test]
async fn slow_provider_times_out() {
    let mut llm = ScriptedLlm::new(LlmProvider::Gemini, "unnecessary", "late");
    llm.delay = Some(Duration::from_secs(5));
    let h = harness(
        llm,
        FakeStore::default(),
        PipelineConfig::default().with_call_timeout(Duration::from_millis(50)),
    );

    let err = h
        .pipeline
        .answer(input("¿Cómo va?", vec![]))
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        PipelineError::Timeout {
            stage: Stage::QueryGeneration,
            ..
        }
    ));
}

#[tokio::test]
async fn blank_question_is_a_validation_error() {
    let h = harness(
        ScriptedLlm::new(LlmProvider::Gemini, "unnecessary", "x"),
        FakeStore::default(),
        PipelineConfig::default(),
    );

    let err = h.pipeline.answer(input("   ", vec![])).await.unwrap_err();
    assert!(matches!(err, PipelineError::Validation(_)));
    assert!(h.llm.prompts().is_empty());
}

#[tokio::test]
async fn only_the_last_ten_turns_reach_the_prompts() {
    let h = harness(
        ScriptedLlm::new(LlmProvider::Gemini, "unnecessary", "ok"),
        FakeStore::default(),
        PipelineConfig::default(),
    );
    let mut history = Vec::new();
    for i in 0..15 {
        history.push(ConversationTurn::teacher(format!("turn-{i:02}")));
        history.push(ConversationTurn::separator());
    }

    h.pipeline
        .answer(input("¿Y ahora?", history))
        .await
        .unwrap();

    for prompt in h.llm.prompts() {
        assert!(!prompt.contains("turn-04"));
        assert!(prompt.contains("Teacher: turn-05"));
        assert!(prompt.contains("Teacher: turn-14"));
        assert_eq!(prompt.matches("Teacher: turn-").count(), 10);
    }
}

#[tokio::test]
async fn unknown_model_falls_back_to_default() {
    let h = harness(
        ScriptedLlm::new(LlmProvider::Gemini, "unnecessary", "from gemini"),
        FakeStore::default(),
        PipelineConfig::default(),
    );
    let mut req = input("hola", vec![]);
    req.model = Some(LlmProvider::Mistral);

    assert_eq!(h.pipeline.answer(req).await.unwrap(), "from gemini");
    assert!(h.sink.contains("model selected: gemini"));
}

#[tokio::test]
async fn same_input_gives_same_prompts_and_answer() {
    let h = harness(
        ScriptedLlm::new(
            LlmProvider::Gemini,
            "SELECT COUNT(*) AS total FROM ejercicios WHERE id_alumno = 7",
            "Ha hecho 12 ejercicios.",
        ),
        FakeStore::with_rows(vec![json!({"total": 12})]),
        PipelineConfig::default(),
    );
    let history = vec![
        ConversationTurn::teacher("¿Quién es?"),
        ConversationTurn::assistant("Lucía, 2º ESO."),
    ];

    let a = h
        .pipeline
        .answer(input("¿Cuántos ejercicios?", history.clone()))
        .await
        .unwrap();
    let b = h
        .pipeline
        .answer(input("¿Cuántos ejercicios?", history))
        .await
        .unwrap();

    assert_eq!(a, b);
    let prompts = h.llm.prompts();
    assert_eq!(prompts.len(), 4);
    assert_eq!(prompts[0], prompts[2]);
    assert_eq!(prompts[1], prompts[3]);
}

#[tokio::test]
async fn non_read_statement_never_reaches_the_store() {
    for reply in ["EXPLAIN SELECT 1", "SHOW tables"] {
        let h = harness(
            ScriptedLlm::new(LlmProvider::Gemini, reply, "never"),
            FakeStore::default(),
            PipelineConfig::default(),
        );

        let err = h
            .pipeline
            .answer(input("¿Qué tablas hay?", vec![]))
            .await
            .unwrap_err();

        assert!(
            matches!(err, PipelineError::UnsafeQuery(GateRejection::NotARead)),
            "{reply}: {err:?}"
        );
        assert!(h.store.calls().is_empty());
        assert_eq!(h.llm.prompts().len(), 1);
    }
}

#[tokio::test]
async fn stalled_database_is_a_store_error() {
    // Accepts TCP and never answers the Postgres handshake.
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    tokio::spawn(async move {
        let mut held = Vec::new();
        while let Ok((socket, _)) = listener.accept().await {
            held.push(socket);
        }
    });
    let store = PgStore::connect(&StoreConfig {
        host: "127.0.0.1".into(),
        port,
        dbname: "tdah".into(),
        user: "app".into(),
        password: None,
        pool_size: 1,
        connect_timeout: Duration::from_millis(300),
    })
    .await
    .unwrap();

    let llm = Arc::new(ScriptedLlm::new(
        LlmProvider::Gemini,
        "SELECT * FROM ejercicios WHERE id_alumno = 7",
        "never",
    ));
    let sink = Arc::new(MemorySink::new());
    let registry = ProviderRegistry::from_providers(
        vec![llm.clone() as Arc<dyn CompletionProvider>],
        LlmProvider::Gemini,
    )
    .unwrap();
    let pipeline = AskPipeline::new(
        Arc::new(registry),
        Arc::new(store),
        sink.clone(),
        PipelineConfig::default().with_call_timeout(Duration::from_secs(3)),
    );

    let err = pipeline
        .answer(input("¿Cómo va?", vec![]))
        .await
        .unwrap_err();

    assert!(matches!(err, PipelineError::Store(_)), "{err:?}");
    assert!(sink.contains("StoreError"));
    assert!(!sink.contains("TimeoutError"));
}

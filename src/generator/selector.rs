//! Choosing an existing value to reuse as an argument or receiver

use std::collections::BTreeSet;
use std::fmt::Write as _;
use std::sync::Arc;

use rand::seq::SliceRandom;
use rand::RngCore;

use super::VariableSelector;
use crate::cluster::{Type, TypeCluster};
use crate::oracle::{OracleError, Pause, RetryPolicy, TextOracle, ThreadPause};
use crate::program::{CandidateFilter, Program, StatementKind, VarRef};
use crate::{Error, Result};

/// Uniform choice among non-null, non-mock compatible values
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomSelector;

impl RandomSelector {
    /// Create a random selector
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl VariableSelector for RandomSelector {
    fn select(
        &mut self,
        program: &Program,
        ty: &Type,
        position: usize,
        cluster: &dyn TypeCluster,
        rng: &mut dyn RngCore,
    ) -> Result<VarRef> {
        program.random_non_null_object(ty, position, cluster, rng)
    }
}

/// Keep only the digits of a reply and read them as an index
///
/// Returns `None` for replies without digits or with an index too large
/// to represent.
#[must_use]
pub fn parse_index(reply: &str) -> Option<usize> {
    let digits: String = reply.chars().filter(char::is_ascii_digit).collect();
    if digits.is_empty() {
        return None;
    }
    digits.parse().ok()
}

/// Describe the selection task for the text oracle
///
/// Lists every candidate with its declaring statement, its distance from
/// `position`, the values its statement reads and what it invokes.
#[must_use]
pub fn selection_prompt(program: &Program, ty: &Type, position: usize, candidates: &[VarRef]) -> String {
    let mut prompt = String::new();
    let _ = writeln!(prompt, "Task: Select the most appropriate variable for testing.\n");

    let _ = writeln!(prompt, "=== Test Case Execution Model ===");
    let _ = writeln!(
        prompt,
        "A test case is a sequence of statements that are executed in order."
    );
    let _ = writeln!(
        prompt,
        "Each statement can only use variables defined in previous statements."
    );
    let _ = writeln!(prompt, "Current statement position: {position}");
    let _ = writeln!(prompt, "Total statements in test: {}\n", program.len());

    let _ = writeln!(prompt, "=== Variable Dependencies ===");
    let _ = writeln!(prompt, "We need a variable of type: {ty}");
    let _ = writeln!(prompt, "This variable will be used at position: {position}");
    let _ = writeln!(
        prompt,
        "Only variables declared before position {position} can be used, to maintain proper initialization order.\n"
    );

    let _ = writeln!(prompt, "=== Available Variables ===");
    for (i, var) in candidates.iter().enumerate() {
        let Some(declared) = var.position() else {
            continue;
        };
        let Ok(statement) = program.statement(declared) else {
            continue;
        };
        let _ = writeln!(prompt, "\nVariable #{i}:");
        let _ = writeln!(prompt, "- Declared at position: {declared}");
        let _ = writeln!(
            prompt,
            "- Statements between declaration and usage: {}",
            position.saturating_sub(declared)
        );
        let _ = writeln!(prompt, "- Declaration: {}", statement.code(declared));

        let dependencies: BTreeSet<usize> = statement
            .variable_references(declared)
            .iter()
            .filter_map(VarRef::position)
            .filter(|&p| p != declared)
            .collect();
        if !dependencies.is_empty() {
            let rendered: Vec<String> = dependencies.iter().map(|p| format!("var{p}")).collect();
            let _ = writeln!(prompt, "- Dependencies: {}", rendered.join(" "));
        }

        match statement.kind() {
            StatementKind::Call { method, .. } => {
                let _ = writeln!(
                    prompt,
                    "- Method call: {} from {}",
                    method.name, method.declaring
                );
            }
            StatementKind::Construct { constructor, .. } => {
                let _ = writeln!(prompt, "- Constructor of: {}", constructor.declaring);
            }
            _ => {}
        }
    }

    let _ = writeln!(prompt, "\n=== Selection Guidelines ===");
    let _ = writeln!(prompt, "1. MUST choose a variable declared before position {position}");
    let _ = writeln!(
        prompt,
        "2. Prefer variables declared closer to position {position} to minimize the scope"
    );
    let _ = writeln!(prompt, "3. Prefer variables with fewer dependencies");
    let _ = writeln!(
        prompt,
        "4. Prefer variables that are directly of type {ty} over those requiring type conversion"
    );
    prompt.push_str(
        "\nReturn **only the index number** of the most appropriate variable based on the above guidelines.",
    );
    prompt
}

/// Selection delegated to a text oracle, with retry and random fallback
///
/// Oracle failures never reach the caller: after the retry policy is
/// exhausted the choice falls back to a uniform pick among the same
/// candidates. The only error is `ConstructionFailed` when no candidate
/// exists.
pub struct LlmVariableSelector {
    oracle: Arc<dyn TextOracle>,
    policy: RetryPolicy,
    pause: Box<dyn Pause>,
}

impl LlmVariableSelector {
    /// Create a selector with the default retry policy
    #[must_use]
    pub fn new(oracle: Arc<dyn TextOracle>) -> Self {
        Self {
            oracle,
            policy: RetryPolicy::default(),
            pause: Box::new(ThreadPause),
        }
    }

    /// Use a different retry policy
    #[must_use]
    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Use a different pause between attempts
    #[must_use]
    pub fn with_pause(mut self, pause: Box<dyn Pause>) -> Self {
        self.pause = pause;
        self
    }

    fn ask(&self, prompt: &str, candidates: &[VarRef], attempt: usize) -> Result<VarRef> {
        let reply = self.oracle.query(prompt)?;
        let index = parse_index(&reply).ok_or_else(|| {
            OracleError::MalformedResponse(format!("no valid index in reply {reply:?}"))
        })?;
        let chosen = candidates.get(index).ok_or_else(|| {
            OracleError::MalformedResponse(format!(
                "index {index} outside [0, {}]",
                candidates.len().saturating_sub(1)
            ))
        })?;
        log::debug!("oracle selected index {index} on attempt {attempt}");
        Ok(chosen.clone())
    }
}

impl VariableSelector for LlmVariableSelector {
    fn select(
        &mut self,
        program: &Program,
        ty: &Type,
        position: usize,
        cluster: &dyn TypeCluster,
        rng: &mut dyn RngCore,
    ) -> Result<VarRef> {
        let candidates =
            program.find_type_compatible(ty, position, CandidateFilter::non_null(), cluster);
        if candidates.is_empty() {
            return Err(Error::ConstructionFailed(format!(
                "found no variables of type {ty} at position {position}"
            )));
        }
        let prompt = selection_prompt(program, ty, position, &candidates);
        match self
            .policy
            .run(self.pause.as_ref(), |attempt| self.ask(&prompt, &candidates, attempt))
        {
            Ok(chosen) => Ok(chosen),
            Err(exhausted) => {
                log::warn!(
                    "all {} oracle selection attempts failed, falling back to random selection: {}",
                    exhausted.attempts,
                    exhausted.last_failure
                );
                candidates.choose(rng).cloned().ok_or_else(|| {
                    Error::ConstructionFailed(format!("found no variables of type {ty}"))
                })
            }
        }
    }
}

impl std::fmt::Debug for LlmVariableSelector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LlmVariableSelector")
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::time::Duration;

    use rand::rngs::StdRng;
    use rand::SeedableRng;

    use super::*;
    use crate::cluster::{ClassDecl, StaticCluster};
    use crate::oracle::testing::RecordingPause;
    use crate::program::fixtures::{foo, new_foo};
    use crate::program::{Literal, MockKind, Statement};

    /// Replays canned replies; errors once the script runs out
    struct ScriptedOracle {
        replies: Mutex<VecDeque<Result<String>>>,
        prompts: Mutex<Vec<String>>,
    }

    impl ScriptedOracle {
        fn new(replies: Vec<Result<String>>) -> Arc<Self> {
            Arc::new(Self {
                replies: Mutex::new(replies.into()),
                prompts: Mutex::new(Vec::new()),
            })
        }

        fn calls(&self) -> usize {
            self.prompts.lock().expect("lock").len()
        }
    }

    impl TextOracle for ScriptedOracle {
        fn query(&self, prompt: &str) -> Result<String> {
            self.prompts.lock().expect("lock").push(prompt.to_string());
            self.replies
                .lock()
                .expect("lock")
                .pop_front()
                .unwrap_or_else(|| Err(OracleError::Transport("script exhausted".into()).into()))
        }
    }

    fn cluster() -> StaticCluster {
        StaticCluster::new().with_class(ClassDecl::new("Foo").with_constructor(vec![]))
    }

    /// Three `Foo` values, a null `Foo` and a functional mock
    fn program() -> Program {
        let mut program = Program::new();
        for _ in 0..3 {
            program.add_statement(new_foo()).expect("add");
        }
        program.add_statement(Statement::null(foo())).expect("add");
        program
            .add_statement(Statement::mock(foo(), MockKind::Functional))
            .expect("add");
        program
    }

    fn selector(oracle: Arc<ScriptedOracle>, pause: Arc<RecordingPause>) -> LlmVariableSelector {
        struct Shared(Arc<RecordingPause>);
        impl Pause for Shared {
            fn pause(&self, duration: Duration) {
                self.0.pause(duration);
            }
        }
        LlmVariableSelector::new(oracle).with_pause(Box::new(Shared(pause)))
    }

    #[test]
    fn test_parse_index() {
        assert_eq!(parse_index("2"), Some(2));
        assert_eq!(parse_index("Index: 1."), Some(1));
        assert_eq!(parse_index("#0"), Some(0));
        assert_eq!(parse_index("none"), None);
        assert_eq!(parse_index(""), None);
        assert_eq!(parse_index("99999999999999999999999999"), None);
    }

    #[test]
    fn test_prompt_lists_candidates() {
        let cluster = cluster();
        let program = program();
        let candidates =
            program.find_type_compatible(&foo(), 5, CandidateFilter::non_null(), &cluster);
        assert_eq!(candidates.len(), 3);
        let prompt = selection_prompt(&program, &foo(), 5, &candidates);
        assert!(prompt.contains("Current statement position: 5"));
        assert!(prompt.contains("Total statements in test: 5"));
        assert!(prompt.contains("We need a variable of type: Foo"));
        assert!(prompt.contains("Variable #2:"));
        assert!(!prompt.contains("Variable #3:"));
        assert!(prompt.contains("- Statements between declaration and usage: 5"));
        assert!(prompt.contains("- Constructor of: Foo"));
        assert!(prompt.ends_with("based on the above guidelines."));
    }

    #[test]
    fn test_prompt_lists_dependencies() {
        let cluster = StaticCluster::new().with_class(
            ClassDecl::new("Foo")
                .with_constructor(vec![])
                .with_method("take", vec![Type::int()], foo()),
        );
        let take = cluster
            .find_method(&foo(), "take", &[Type::int()])
            .expect("method");
        let mut program = Program::new();
        let receiver = program.add_statement(new_foo()).expect("add");
        let int = program
            .add_statement(Statement::literal(Literal::Int(3), Type::int()))
            .expect("add");
        let result = program
            .add_statement(Statement::call(take, Some(receiver), vec![int]))
            .expect("add");
        let prompt = selection_prompt(&program, &foo(), 3, &[result]);
        assert!(prompt.contains("- Dependencies: var0 var1"));
        assert!(prompt.contains("- Method call: take from Foo"));
    }

    #[test]
    fn test_oracle_choice_is_used() {
        let cluster = cluster();
        let oracle = ScriptedOracle::new(vec![Ok("1".to_string())]);
        let pause = Arc::new(RecordingPause::default());
        let mut selector = selector(Arc::clone(&oracle), Arc::clone(&pause));
        let mut rng = StdRng::seed_from_u64(0);
        let chosen = selector
            .select(&program(), &foo(), 5, &cluster, &mut rng)
            .expect("select should succeed");
        assert_eq!(chosen, VarRef::Value(1));
        assert_eq!(oracle.calls(), 1);
        assert!(pause.recorded().is_empty());
    }

    #[test]
    fn test_bad_replies_are_retried_with_backoff() {
        let cluster = cluster();
        let oracle = ScriptedOracle::new(vec![
            Ok("no idea".to_string()),
            Ok("7".to_string()),
            Ok("Variable #2".to_string()),
        ]);
        let pause = Arc::new(RecordingPause::default());
        let mut selector = selector(Arc::clone(&oracle), Arc::clone(&pause));
        let mut rng = StdRng::seed_from_u64(0);
        let chosen = selector
            .select(&program(), &foo(), 5, &cluster, &mut rng)
            .expect("select should succeed");
        assert_eq!(chosen, VarRef::Value(2));
        assert_eq!(oracle.calls(), 3);
        assert_eq!(
            pause.recorded(),
            vec![Duration::from_millis(100), Duration::from_millis(200)]
        );
    }

    #[test]
    fn test_failures_fall_back_to_random_candidate() {
        let cluster = cluster();
        let oracle = ScriptedOracle::new(vec![]);
        let pause = Arc::new(RecordingPause::default());
        let mut selector = selector(Arc::clone(&oracle), Arc::clone(&pause));
        let mut rng = StdRng::seed_from_u64(0);
        let chosen = selector
            .select(&program(), &foo(), 5, &cluster, &mut rng)
            .expect("fallback should succeed");
        assert!(matches!(chosen, VarRef::Value(p) if p < 3));
        assert_eq!(oracle.calls(), 3);
        assert_eq!(pause.recorded().len(), 2);
    }

    #[test]
    fn test_no_candidates_is_construction_failure() {
        let cluster = cluster();
        let oracle = ScriptedOracle::new(vec![Ok("0".to_string())]);
        let mut selector = LlmVariableSelector::new(Arc::clone(&oracle) as Arc<dyn TextOracle>);
        let mut rng = StdRng::seed_from_u64(0);
        let err = selector
            .select(&program(), &Type::string(), 5, &cluster, &mut rng)
            .expect_err("should fail");
        assert!(err.is_construction_failure());
        assert_eq!(oracle.calls(), 0);
    }

    #[test]
    fn test_abstract_mock_is_never_offered() {
        let cluster = cluster();
        let mut program = Program::new();
        program
            .add_statement(Statement::mock(foo(), MockKind::AbstractClass))
            .expect("add");
        let mut rng = StdRng::seed_from_u64(0);

        let random = RandomSelector::new().select(&program, &foo(), 1, &cluster, &mut rng);
        assert!(random.expect_err("random should fail").is_construction_failure());

        let oracle = ScriptedOracle::new(vec![Ok("0".to_string())]);
        let mut guided = LlmVariableSelector::new(Arc::clone(&oracle) as Arc<dyn TextOracle>);
        let err = guided
            .select(&program, &foo(), 1, &cluster, &mut rng)
            .expect_err("guided should fail");
        assert!(err.is_construction_failure());
        assert_eq!(oracle.calls(), 0);
    }

    #[test]
    fn test_random_selector_skips_null_and_mocks() {
        let cluster = cluster();
        let program = program();
        let mut rng = StdRng::seed_from_u64(4);
        for _ in 0..20 {
            let chosen = RandomSelector::new()
                .select(&program, &foo(), 5, &cluster, &mut rng)
                .expect("select should succeed");
            assert!(matches!(chosen, VarRef::Value(p) if p < 3));
        }
    }
}

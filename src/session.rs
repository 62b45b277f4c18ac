//! A signed-in user's workflow session
//!
//! Composes the browser, selection, pipeline, and publish sub-states and
//! enforces the cross-cutting resets: picking a repository clears the file
//! selection, suggestions, generated tests, and PR URL; clearing tests
//! also drops the selection and PR URL. Nothing here survives the process.

use crate::ai::TextGenerator;
use crate::browser::{BrowserState, FetchTicket};
use crate::error::{Error, Result};
use crate::github::{FileContent, SourceHost};
use crate::pipeline::{self, PipelineState, TestCase, TestCaseSummary};
use crate::publish::{self, PublishState};
use crate::selection::SelectionSet;

pub struct Session {
    /// Display name of the signed-in user, used as the owner fallback when
    /// a repository listing carries no owner object.
    user_name: Option<String>,
    pub browser: BrowserState,
    pub selection: SelectionSet,
    pub pipeline: PipelineState,
    pub publish: PublishState,
}

impl Session {
    pub fn new(user_name: Option<String>) -> Self {
        Self {
            user_name,
            browser: BrowserState::new(),
            selection: SelectionSet::new(),
            pipeline: PipelineState::new(),
            publish: PublishState::new(),
        }
    }

    /// Select a repository. Everything derived from the previous repo is
    /// dropped: selection, suggestions, generated tests, PR URL.
    pub fn select_repository(&mut self, name: impl Into<String>) -> FetchTicket {
        let ticket = self.browser.begin_select_repository(name);
        self.selection.clear();
        self.pipeline.clear();
        self.publish.clear();
        ticket
    }

    /// Discard suggestions and generated tests, along with the selection
    /// and any prior PR URL.
    pub fn clear_tests(&mut self) {
        self.pipeline.clear();
        self.publish.clear();
        self.selection.clear();
    }

    /// Owner login for API calls: the selected repository's recorded
    /// owner, else the signed-in display name. The fallback is a known
    /// approximation and can misresolve forked or org-owned repositories.
    pub fn owner(&self) -> Option<&str> {
        self.browser.owner_login().or(self.user_name.as_deref())
    }

    /// The files the pipeline operates on: the selection when non-empty,
    /// else the currently viewed file.
    pub fn analysis_files(&self) -> Vec<FileContent> {
        if !self.selection.is_empty() {
            self.selection.files().to_vec()
        } else {
            self.browser.viewed_file().cloned().into_iter().collect()
        }
    }

    /// Run stage A over the current analysis files and store the results.
    pub async fn summarize(&mut self, generator: &dyn TextGenerator) -> Result<()> {
        let files = self.analysis_files();
        let framework = self.pipeline.framework().to_string();
        let kind = self.pipeline.kind();
        let summaries = pipeline::summarize(generator, &files, &framework, kind).await?;
        self.pipeline.set_summaries(summaries);
        Ok(())
    }

    /// Run stage B for one summary and record the result.
    pub async fn generate_test(
        &mut self,
        generator: &dyn TextGenerator,
        summary: &TestCaseSummary,
    ) -> Result<TestCase> {
        let framework = self.pipeline.framework().to_string();
        let kind = self.pipeline.kind();
        let test = pipeline::generate(
            generator,
            summary,
            self.selection.files(),
            self.browser.viewed_file(),
            &framework,
            kind,
        )
        .await?;
        self.pipeline.record_test(test.clone());
        Ok(test)
    }

    /// Publish a generated test as a pull request against the selected
    /// repository and store the resulting URL.
    pub async fn publish_test(
        &mut self,
        host: &dyn SourceHost,
        token: &str,
        test: &TestCase,
    ) -> Result<String> {
        if token.is_empty() {
            return Err(Error::Auth(
                "Not authenticated or no repo selected".to_string(),
            ));
        }
        let repo = self
            .browser
            .selected_repo()
            .ok_or_else(|| Error::Auth("Not authenticated or no repo selected".to_string()))?
            .to_string();
        let owner = self
            .owner()
            .ok_or_else(|| Error::Auth("Could not resolve repository owner".to_string()))?
            .to_string();

        let url = publish::publish(host, token, &owner, &repo, test).await?;
        self.publish.set_pr_url(url.clone());
        Ok(url)
    }
}

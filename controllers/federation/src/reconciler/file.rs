//! File reconciliation.
//!
//! Guest files are uploaded as multipart forms. A 200 means the partner
//! already holds the file; any other 2xx means it accepted the upload and is
//! still fetching from the repository.

use super::Reconciler;
use super::lifecycle::{FederatedResource, SyncOutcome};
use crate::error::ControllerError;
use async_trait::async_trait;
use crds::{ExternalId, FILE_FINALIZER, File, FileState, FileStatus, Phase};
use kube_runtime::controller::Action;
use partner_client::{
    ObjectRepoLocation, OsType, PartnerApi, PartnerError, PartnerResponse, ResponseClass,
    UploadFileForm,
};

/// Upload form of `file`
pub(crate) fn upload_form(file: &File) -> UploadFileForm {
    let spec = &file.spec;
    let image = spec.image.as_ref();
    UploadFileForm {
        app_provider_id: spec.app_provider_id.clone(),
        checksum: spec.checksum.clone(),
        file_description: spec.file_description.clone(),
        file_id: ExternalId::of(file).to_string(),
        file_name: spec.file_name.clone(),
        file_repo_location: spec.repo_location.as_ref().map(|repo| ObjectRepoLocation {
            repo_url: Some(repo.url.clone()).filter(|u| !u.is_empty()),
            user_name: repo.user_name.clone(),
            password: repo.password.clone(),
            token: repo.token.clone(),
        }),
        file_type: spec.file_type.clone(),
        file_version_info: spec.file_version.clone(),
        img_ins_set_arch: image.and_then(|i| i.instruction_set_architecture.clone()),
        img_os_type: image.and_then(|i| i.os.as_ref()).map(|os| OsType {
            architecture: os.architecture.clone(),
            distribution: os.distribution.clone(),
            version: os.version.clone(),
            license: os.license.clone(),
        }),
        repo_type: spec.repo_location.as_ref().and_then(|r| r.repo_type.clone()),
    }
}

#[async_trait]
impl FederatedResource for File {
    const KIND: &'static str = "File";
    const FINALIZER: &'static str = FILE_FINALIZER;
    const MISSING_DEPENDENCY: Option<&'static str> = Some("file not found");

    type Status = FileStatus;

    fn status_snapshot(&self) -> Option<FileStatus> {
        self.status.clone()
    }

    fn phase(&self) -> Option<Phase> {
        self.status.as_ref().and_then(|s| s.phase)
    }

    fn set_phase(&mut self, phase: Phase) {
        self.status.get_or_insert_with(Default::default).phase = Some(phase);
    }

    fn record_rejection(&mut self, _detail: &str) {
        let status = self.status.get_or_insert_with(Default::default);
        status.phase = Some(Phase::Error);
        status.state = Some(FileState::Error);
    }

    fn record_unclassified(&mut self, _status_code: u16) {
        let status = self.status.get_or_insert_with(Default::default);
        status.phase = Some(Phase::Error);
        status.state = Some(FileState::Error);
    }

    fn is_created(&self) -> bool {
        matches!(
            self.status.as_ref().and_then(|s| s.state),
            Some(FileState::Pending | FileState::Ready)
        )
    }

    fn converge_locally(&mut self) {
        let status = self.status.get_or_insert_with(Default::default);
        status.phase = Some(Phase::Ready);
        status.state.get_or_insert(FileState::Pending);
    }

    async fn push(
        &mut self,
        partner: &dyn PartnerApi,
        context_id: &str,
    ) -> Result<SyncOutcome, ControllerError> {
        let form = upload_form(self).encode().map_err(PartnerError::from)?;
        let response = partner.upload_file(context_id, form).await?;

        if response.class(Self::MISSING_DEPENDENCY) != ResponseClass::Success {
            return Ok(SyncOutcome::from_response(&response, Self::MISSING_DEPENDENCY));
        }

        let status = self.status.get_or_insert_with(Default::default);
        status.phase = Some(Phase::Ready);
        status.state = Some(if response.status == 200 {
            FileState::Ready
        } else {
            FileState::Pending
        });
        Ok(SyncOutcome::synced())
    }

    async fn withdraw(
        &self,
        partner: &dyn PartnerApi,
        context_id: &str,
    ) -> Result<PartnerResponse<()>, ControllerError> {
        Ok(partner
            .remove_file(context_id, ExternalId::of(self).as_str())
            .await?)
    }
}

impl Reconciler {
    /// Reconciles the File `name`
    pub async fn reconcile_file(&self, name: &str) -> Result<Action, ControllerError> {
        self.reconcile_federated(self.stores.files.as_ref(), name).await
    }
}

//! Tipos de dados para requisições e respostas da API de control plane do Atlas.
//!
//! Todas as structs derivam `Serialize` e `Deserialize` para conversão JSON
//! conforme o formato camelCase esperado pelos endpoints `v1.0` do Atlas.

use serde::{Deserialize, Serialize};

/// Corpo da requisição de criação de cluster (`POST /groups/{id}/clusters`).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterRequest {
    /// Configuração de auto-scaling de disco.
    pub auto_scaling: AutoScaling,
    /// Backups contínuos — desabilitados para clusters de demonstração.
    pub backup_enabled: bool,
    /// Nome do cluster (ex.: `edu-1700000000000`).
    pub name: String,
    /// Provedor, tamanho de instância e região.
    pub provider_settings: ProviderSettings,
}

/// Bloco de auto-scaling dentro da requisição de cluster.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AutoScaling {
    /// O campo é serializado como `diskGBEnabled`, fora do padrão camelCase.
    #[serde(rename = "diskGBEnabled")]
    pub disk_gb_enabled: bool,
}

/// Provedor de nuvem e dimensionamento do cluster.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderSettings {
    /// Nome do provedor ("AWS", "GCP", "AZURE").
    pub provider_name: String,
    /// Tamanho da instância (ex.: "M30").
    pub instance_size_name: String,
    /// Região do provedor (ex.: "US_EAST_1").
    pub region_name: String,
}

/// Resposta dos endpoints de cluster (criação e consulta).
///
/// Só os campos que dirigem a máquina de estados são deserializados;
/// o restante do payload é ignorado.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterResponse {
    /// Nome do cluster.
    pub name: String,
    /// Estado informado pelo control plane (ex.: "CREATING", "IDLE").
    #[serde(default)]
    pub state_name: Option<String>,
    /// Connection strings, presentes quando o cluster já está provisionado.
    #[serde(default)]
    pub connection_strings: Option<ConnectionStrings>,
}

/// Connection strings expostas nos metadados do cluster.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionStrings {
    /// URI SRV padrão do cluster.
    #[serde(default)]
    pub standard_srv: Option<String>,
    /// URI do endpoint federado do online archive, sem credenciais.
    #[serde(default)]
    pub online_archive: Option<String>,
}

/// Corpo da requisição de criação de online archive
/// (`POST /groups/{id}/clusters/{name}/onlineArchives`).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArchiveRequest {
    /// Banco de dados da coleção arquivada.
    pub db_name: String,
    /// Nome da coleção arquivada.
    pub coll_name: String,
    /// Campos de particionamento do armazenamento frio, em ordem.
    pub partition_fields: Vec<PartitionField>,
    /// Critério de elegibilidade por data.
    pub criteria: ArchiveCriteria,
}

/// Um campo de particionamento do arquivo.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PartitionField {
    /// Caminho do campo no documento (ex.: "student_name.last").
    pub field_name: String,
    /// Posição na hierarquia de particionamento (0 = mais externa).
    pub order: u32,
}

/// Critério de elegibilidade baseado em data.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArchiveCriteria {
    /// Tipo do critério — sempre "DATE" aqui. Serializado como "type".
    #[serde(rename = "type")]
    pub criteria_type: String,
    /// Campo de data que determina a elegibilidade.
    pub date_field: String,
    /// Formato do campo de data ("ISODATE").
    pub date_format: String,
    /// Documentos mais antigos que isto (em dias) tornam-se elegíveis.
    pub expire_after_days: u32,
}

impl ArchiveCriteria {
    /// Critério DATE/ISODATE sobre o campo fornecido.
    pub fn date(date_field: &str, expire_after_days: u32) -> Self {
        Self {
            criteria_type: "DATE".to_string(),
            date_field: date_field.to_string(),
            date_format: "ISODATE".to_string(),
            expire_after_days,
        }
    }
}

/// Estado de um online archive, retornado na criação e na consulta.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArchiveStatus {
    /// Identificador opaco do arquivo, estável após a criação.
    #[serde(rename = "_id")]
    pub id: String,
    /// Estado informado pelo control plane (ex.: "PENDING", "ACTIVE").
    #[serde(default)]
    pub state: String,
    /// Presente depois que a primeira passada de arquivamento termina.
    /// A presença deste campo é a condição terminal da sondagem.
    #[serde(default)]
    pub last_archive_run: Option<serde_json::Value>,
}

impl ArchiveStatus {
    /// Verdadeiro quando pelo menos uma passada de arquivamento concluiu.
    pub fn has_completed_run(&self) -> bool {
        self.last_archive_run.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cluster_request_serializes_vendor_field_names() {
        let req = ClusterRequest {
            auto_scaling: AutoScaling { disk_gb_enabled: true },
            backup_enabled: false,
            name: "edu-17".into(),
            provider_settings: ProviderSettings {
                provider_name: "AWS".into(),
                instance_size_name: "M30".into(),
                region_name: "US_EAST_1".into(),
            },
        };
        let json = serde_json::to_string(&req).unwrap();
        assert!(json.contains(r#""diskGBEnabled":true"#));
        assert!(json.contains(r#""backupEnabled":false"#));
        assert!(json.contains(r#""providerSettings""#));
        assert!(json.contains(r#""instanceSizeName":"M30""#));
        assert!(!json.contains("disk_gb_enabled"));
    }

    #[test]
    fn archive_request_serializes_criteria() {
        let req = ArchiveRequest {
            db_name: "education".into(),
            coll_name: "student_grades".into(),
            partition_fields: vec![
                PartitionField {
                    field_name: "student_name.last".into(),
                    order: 0,
                },
                PartitionField {
                    field_name: "assignment_name".into(),
                    order: 1,
                },
            ],
            criteria: ArchiveCriteria::date("date_completed", 7),
        };
        let json = serde_json::to_string(&req).unwrap();
        assert!(json.contains(r#""dbName":"education""#));
        assert!(json.contains(r#""partitionFields""#));
        assert!(json.contains(r#""fieldName":"student_name.last""#));
        assert!(json.contains(r#""type":"DATE""#));
        assert!(json.contains(r#""dateFormat":"ISODATE""#));
        assert!(json.contains(r#""expireAfterDays":7"#));
    }

    #[test]
    fn archive_status_without_last_run() {
        let json = r#"{"_id":"64abc","state":"PENDING"}"#;
        let status: ArchiveStatus = serde_json::from_str(json).unwrap();
        assert_eq!(status.id, "64abc");
        assert_eq!(status.state, "PENDING");
        assert!(!status.has_completed_run());
    }

    #[test]
    fn archive_status_with_last_run() {
        let json = r#"{
            "_id": "64abc",
            "state": "ACTIVE",
            "lastArchiveRun": {"endDate": "2024-01-01T00:00:00Z"}
        }"#;
        let status: ArchiveStatus = serde_json::from_str(json).unwrap();
        assert!(status.has_completed_run());
    }

    #[test]
    fn cluster_response_deserialize_from_api_format() {
        let json = r#"{
            "name": "edu-17",
            "stateName": "IDLE",
            "connectionStrings": {
                "standardSrv": "mongodb+srv://edu-17.ab1cd.mongodb.net",
                "onlineArchive": "mongodb://atlas-online-archive-64abc.ab1cd.mongodb.net/?ssl=true"
            }
        }"#;
        let resp: ClusterResponse = serde_json::from_str(json).unwrap();
        assert_eq!(resp.name, "edu-17");
        assert_eq!(resp.state_name.as_deref(), Some("IDLE"));
        let strings = resp.connection_strings.unwrap();
        assert!(strings.online_archive.unwrap().starts_with("mongodb://atlas-online-archive"));
    }

    #[test]
    fn cluster_response_tolerates_missing_fields() {
        let json = r#"{"name": "edu-17"}"#;
        let resp: ClusterResponse = serde_json::from_str(json).unwrap();
        assert!(resp.state_name.is_none());
        assert!(resp.connection_strings.is_none());
    }
}

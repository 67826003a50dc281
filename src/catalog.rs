//! Built-in catalog of the school console's resources.

use serde::Serialize;
use serde_json::json;

use crate::error::SchemaError;
use crate::schema::{
    Column, Condition, ResourceAction, ResourceConfig, ResourceField, ResourceRef, Registry,
};

const SEXO: &[(&str, &str)] = &[("M", "Masculino"), ("F", "Feminino"), ("O", "Outro")];

const STATUS_ALUNO: &[(&str, &str)] = &[
    ("ATIVO", "Ativo"),
    ("INATIVO", "Inativo"),
    ("TRANCADO", "Trancado"),
];

const STATUS_PROFESSOR: &[(&str, &str)] = &[("ATIVO", "Ativo"), ("INATIVO", "Inativo")];

const TIPO_VINCULO: &[(&str, &str)] = &[("CLT", "CLT"), ("HORISTA", "Horista"), ("PJ", "PJ")];

const TURNO: &[(&str, &str)] = &[("MANHA", "Manha"), ("TARDE", "Tarde"), ("NOITE", "Noite")];

const STATUS_TURMA: &[(&str, &str)] = &[("ATIVA", "Ativa"), ("ENCERRADA", "Encerrada")];

const STATUS_CONTRATO: &[(&str, &str)] = &[
    ("RASCUNHO", "Rascunho"),
    ("EMITIDO", "Emitido"),
    ("CANCELADO", "Cancelado"),
];

const TIPO_ASSINATURA: &[(&str, &str)] = &[
    ("RESPONSAVEL", "Responsavel"),
    ("ESCOLA", "Escola"),
    ("TESTEMUNHA_1", "Testemunha 1"),
    ("TESTEMUNHA_2", "Testemunha 2"),
];

const FORMA_PAGAMENTO: &[(&str, &str)] = &[
    ("DINHEIRO", "Dinheiro"),
    ("PIX", "Pix"),
    ("BOLETO", "Boleto"),
    ("CARTAO", "Cartao"),
];

const MODELO_PAGAMENTO: &[(&str, &str)] = &[
    ("MENSAL", "Mensal"),
    ("TRIMESTRAL", "Trimestral"),
    ("SEMESTRAL", "Semestral"),
    ("ANUAL", "Anual"),
];

const BOLSA_TIPO: &[(&str, &str)] = &[
    ("NENHUMA", "Nenhuma"),
    ("PARCIAL", "Parcial"),
    ("INTEGRAL", "Integral"),
    ("CONVENIO", "Convenio"),
];

const STATUS_PAGAMENTO_ALUNO: &[(&str, &str)] = &[
    ("PAGO", "Pago"),
    ("EM_ABERTO", "Em aberto"),
    ("ATRASADO", "Atrasado"),
    ("ISENTO", "Isento"),
];

const STATUS_PAGAMENTO_PROFESSOR: &[(&str, &str)] = &[("PAGO", "Pago"), ("PENDENTE", "Pendente")];

const DESPESA_CATEGORIA: &[(&str, &str)] = &[
    ("AGUA", "Agua"),
    ("LUZ", "Luz"),
    ("ALUGUEL", "Aluguel"),
    ("INTERNET", "Internet"),
    ("MATERIAL", "Material"),
    ("OUTROS", "Outros"),
];

const DESPESA_TIPO: &[(&str, &str)] = &[("FIXA", "Fixa"), ("VARIAVEL", "Variavel")];

/// Navigation group of resources.
#[derive(Debug, Clone, Serialize)]
pub struct Section {
    pub path: &'static str,
    pub title: &'static str,
    pub description: &'static str,
    /// Resource keys, in menu order.
    pub items: &'static [&'static str],
}

pub const SECTIONS: &[Section] = &[
    Section {
        path: "/cadastros",
        title: "Cadastros",
        description: "Centralize cadastros essenciais do painel escolar.",
        items: &["escolas", "responsaveis", "alunos", "professores", "turmas"],
    },
    Section {
        path: "/financeiro",
        title: "Financeiro",
        description: "Fluxo de pagamentos, planos e despesas.",
        items: &[
            "planos",
            "pagamentos-alunos",
            "pagamentos-professores",
            "despesas",
        ],
    },
    Section {
        path: "/documentos",
        title: "Documentos",
        description: "Modelos, contratos e assinaturas digitais.",
        items: &["templates", "contratos", "assinaturas"],
    },
    Section {
        path: "/seguranca",
        title: "Seguranca",
        description: "Controle de acesso e politicas administrativas.",
        items: &["permissoes", "grupos", "usuarios"],
    },
];

/// The built-in registry.
///
/// # Errors
///
/// Only fails if the catalog itself is inconsistent.
pub fn builtin() -> Result<Registry, SchemaError> {
    Registry::new(builtin_configs())
}

pub fn builtin_configs() -> Vec<ResourceConfig> {
    vec![
        escolas(),
        responsaveis(),
        alunos(),
        professores(),
        turmas(),
        planos(),
        pagamentos_alunos(),
        pagamentos_professores(),
        despesas(),
        templates(),
        contratos(),
        assinaturas(),
        permissoes(),
        grupos(),
        usuarios(),
    ]
}

fn escolas() -> ResourceConfig {
    ResourceConfig::new("escolas", "Escolas", "/escolas")
        .singular("Escola")
        .description("Cadastre e acompanhe as unidades escolares.")
        .fields(vec![
            ResourceField::text("razao_social", "Razao social").required(),
            ResourceField::text("nome_fantasia", "Nome fantasia").required(),
            ResourceField::text("cnpj", "CNPJ").required(),
            ResourceField::textarea("endereco_completo", "Endereco completo").required(),
            ResourceField::text("cidade", "Cidade").required(),
            ResourceField::text("uf", "UF").required(),
            ResourceField::text("telefone", "Telefone").required(),
            ResourceField::email("email", "Email").required(),
            ResourceField::text("responsavel", "Responsavel").required(),
        ])
        .columns(vec![
            Column::new("nome_fantasia", "Nome fantasia"),
            Column::new("cnpj", "CNPJ"),
            Column::new("cidade", "Cidade"),
            Column::new("telefone", "Telefone"),
        ])
        .section("Identificacao", &["razao_social", "nome_fantasia", "cnpj"])
        .section("Endereco", &["endereco_completo", "cidade", "uf"])
        .section("Contato", &["telefone", "email", "responsavel"])
        .filters(&["uf"])
}

fn responsaveis() -> ResourceConfig {
    ResourceConfig::new("responsaveis", "Responsaveis", "/responsaveis")
        .singular("Responsavel")
        .description("Gerencie os responsaveis financeiros e legais.")
        .fields(vec![
            ResourceField::text("nome_completo", "Nome completo").required(),
            ResourceField::text("cpf", "CPF").required(),
            ResourceField::text("rg", "RG"),
            ResourceField::textarea("endereco", "Endereco").required(),
            ResourceField::text("telefone", "Telefone").required(),
            ResourceField::email("email", "Email").required(),
        ])
        .columns(vec![
            Column::new("nome_completo", "Nome"),
            Column::new("cpf", "CPF"),
            Column::new("telefone", "Telefone"),
            Column::new("email", "Email"),
        ])
        .section("Identificacao", &["nome_completo", "cpf", "rg"])
        .section("Contato", &["endereco", "telefone", "email"])
}

fn alunos() -> ResourceConfig {
    ResourceConfig::new("alunos", "Alunos", "/alunos")
        .singular("Aluno")
        .description("Mantenha matriculas, documentos e status atualizados.")
        .fields(vec![
            ResourceField::text("nome_completo", "Nome completo").required(),
            ResourceField::text("cpf", "CPF"),
            ResourceField::date("data_nascimento", "Data de nascimento").required(),
            ResourceField::choice("sexo", "Sexo", SEXO).required(),
            ResourceField::textarea("endereco", "Endereco").required(),
            ResourceField::text("telefone", "Telefone").required(),
            ResourceField::lookup(
                "responsavel",
                "Responsavel",
                ResourceRef::new("/responsaveis", "nome_completo"),
            ),
            ResourceField::text("nome_responsavel", "Nome responsavel"),
            ResourceField::text("telefone_responsavel", "Telefone responsavel"),
            ResourceField::email("email_responsavel", "Email responsavel"),
            ResourceField::choice("status", "Status", STATUS_ALUNO).default_value(json!("ATIVO")),
            ResourceField::date("data_matricula", "Data de matricula").required(),
            ResourceField::text("numero_matricula", "Numero matricula"),
            ResourceField::lookup("turma", "Turma", ResourceRef::new("/turmas", "nome")).required(),
            ResourceField::lookup(
                "plano_financeiro",
                "Plano financeiro",
                ResourceRef::new("/planos", "nome"),
            ),
            ResourceField::currency("valor_mensalidade", "Valor mensalidade").required(),
            ResourceField::textarea("observacoes", "Observacoes"),
            ResourceField::textarea("historico_escolar", "Historico escolar"),
        ])
        .columns(vec![
            Column::new("nome_completo", "Aluno"),
            Column::new("turma_nome", "Turma"),
            Column::new("plano_financeiro_nome", "Plano"),
            Column::new("status", "Status"),
            Column::new("data_matricula", "Matricula"),
        ])
        .section("Dados do aluno", &["nome_completo", "cpf", "data_nascimento", "sexo"])
        .section("Contato", &["endereco", "telefone"])
        .section(
            "Responsavel",
            &["responsavel", "nome_responsavel", "telefone_responsavel", "email_responsavel"],
        )
        .section(
            "Matricula",
            &[
                "status",
                "data_matricula",
                "numero_matricula",
                "turma",
                "plano_financeiro",
                "valor_mensalidade",
            ],
        )
        .section("Historico", &["observacoes", "historico_escolar"])
        .filters(&["status", "turma", "sexo"])
}

fn professores() -> ResourceConfig {
    ResourceConfig::new("professores", "Professores", "/professores")
        .singular("Professor")
        .description("Gestao completa da equipe docente.")
        .fields(vec![
            ResourceField::text("nome_completo", "Nome completo").required(),
            ResourceField::text("cpf", "CPF").required(),
            ResourceField::text("especialidade", "Especialidade").required(),
            ResourceField::text("telefone", "Telefone").required(),
            ResourceField::email("email", "Email").required(),
            ResourceField::choice("tipo_vinculo", "Tipo vinculo", TIPO_VINCULO).required(),
            ResourceField::currency("valor_hora", "Valor hora"),
            ResourceField::currency("salario_fixo", "Salario fixo"),
            ResourceField::choice("status", "Status", STATUS_PROFESSOR)
                .default_value(json!("ATIVO")),
        ])
        .columns(vec![
            Column::new("nome_completo", "Professor"),
            Column::new("especialidade", "Especialidade"),
            Column::new("tipo_vinculo", "Vinculo"),
            Column::new("status", "Status"),
        ])
        .section("Dados principais", &["nome_completo", "cpf", "especialidade"])
        .section("Contato", &["telefone", "email"])
        .section("Vinculo", &["tipo_vinculo", "valor_hora", "salario_fixo", "status"])
        .filters(&["status", "tipo_vinculo"])
}

fn turmas() -> ResourceConfig {
    ResourceConfig::new("turmas", "Turmas", "/turmas")
        .singular("Turma")
        .description("Organize classes, horarios e professores responsaveis.")
        .fields(vec![
            ResourceField::text("nome", "Nome").required(),
            ResourceField::text("serie_ano", "Serie/ano").required(),
            ResourceField::choice("turno", "Turno", TURNO).required(),
            ResourceField::lookup(
                "professor_responsavel",
                "Professor responsavel",
                ResourceRef::new("/professores", "nome_completo"),
            )
            .required(),
            ResourceField::currency("valor_mensalidade", "Valor mensalidade").required(),
            ResourceField::number("capacidade_maxima", "Capacidade maxima").required(),
            ResourceField::choice("status", "Status", STATUS_TURMA).default_value(json!("ATIVA")),
        ])
        .columns(vec![
            Column::new("nome", "Turma"),
            Column::new("serie_ano", "Serie/ano"),
            Column::new("turno", "Turno"),
            Column::new("professor_nome", "Professor"),
            Column::new("status", "Status"),
        ])
        .section("Identificacao", &["nome", "serie_ano", "turno"])
        .section("Equipe", &["professor_responsavel", "capacidade_maxima", "status"])
        .section("Financeiro", &["valor_mensalidade"])
        .filters(&["status", "turno"])
}

fn planos() -> ResourceConfig {
    ResourceConfig::new("planos", "Planos educacionais", "/planos")
        .singular("Plano")
        .description("Defina valores, duracao e regras financeiras.")
        .fields(vec![
            ResourceField::text("nome", "Nome").required(),
            ResourceField::currency("valor_mensalidade", "Valor mensalidade").required(),
            ResourceField::choice("modelo_pagamento", "Modelo pagamento", MODELO_PAGAMENTO)
                .required()
                .default_value(json!("MENSAL")),
            ResourceField::number("dia_vencimento", "Dia vencimento").required(),
            ResourceField::number("duracao_meses", "Duracao (meses)").required(),
            ResourceField::choice(
                "forma_pagamento_padrao",
                "Forma pagamento padrao",
                FORMA_PAGAMENTO,
            ),
            ResourceField::currency("taxa_matricula", "Taxa matricula")
                .required()
                .default_value(json!(0)),
            ResourceField::currency("desconto_percent", "Desconto (%)").default_value(json!(0)),
            ResourceField::choice("bolsa_tipo", "Bolsa", BOLSA_TIPO)
                .default_value(json!("NENHUMA")),
            ResourceField::currency("bolsa_percent", "Bolsa (%)").default_value(json!(0)),
            ResourceField::currency("multa_percent", "Multa (%)")
                .required()
                .default_value(json!(0)),
            ResourceField::currency("juros_percent", "Juros fixo (%)")
                .required()
                .default_value(json!(0)),
            ResourceField::currency("juros_diario_percent", "Juros diario (%)")
                .default_value(json!(0)),
            ResourceField::boolean("ativo", "Ativo").default_value(json!(true)),
        ])
        .columns(vec![
            Column::new("nome", "Plano"),
            Column::new("modelo_pagamento", "Modelo"),
            Column::new("valor_mensalidade", "Mensalidade"),
            Column::new("dia_vencimento", "Vencimento"),
            Column::new("ativo", "Ativo"),
        ])
        .section(
            "Plano",
            &[
                "nome",
                "modelo_pagamento",
                "valor_mensalidade",
                "dia_vencimento",
                "duracao_meses",
                "forma_pagamento_padrao",
                "ativo",
            ],
        )
        .section("Descontos e bolsas", &["desconto_percent", "bolsa_tipo", "bolsa_percent"])
        .section(
            "Encargos",
            &["taxa_matricula", "multa_percent", "juros_percent", "juros_diario_percent"],
        )
        .filters(&["modelo_pagamento", "ativo"])
}

fn pagamentos_alunos() -> ResourceConfig {
    ResourceConfig::new("pagamentos-alunos", "Pagamentos de alunos", "/pagamentos-alunos")
        .singular("Pagamento aluno")
        .description("Controle mensalidades, vencimentos e recebimentos.")
        .fields(vec![
            ResourceField::lookup(
                "aluno",
                "Aluno",
                ResourceRef::new("/alunos", "nome_completo"),
            )
            .required(),
            ResourceField::lookup("plano", "Plano", ResourceRef::new("/planos", "nome")),
            ResourceField::date("competencia", "Competencia").required(),
            ResourceField::currency("valor", "Valor").required(),
            ResourceField::currency("valor_pago", "Valor pago")
                .helper("Preencha quando o pagamento for concluido."),
            ResourceField::currency("desconto", "Desconto").read_only(),
            ResourceField::currency("multa", "Multa").read_only(),
            ResourceField::currency("juros", "Juros").read_only(),
            ResourceField::number("dias_atraso", "Dias atraso").read_only(),
            ResourceField::currency("valor_total", "Total devido").read_only(),
            ResourceField::date("data_vencimento", "Data vencimento").required(),
            ResourceField::date("data_pagamento", "Data pagamento"),
            ResourceField::choice("forma_pagamento", "Forma pagamento", FORMA_PAGAMENTO)
                .required(),
            ResourceField::choice("status", "Status", STATUS_PAGAMENTO_ALUNO)
                .default_value(json!("EM_ABERTO")),
            ResourceField::textarea("observacoes", "Observacoes"),
        ])
        .columns(vec![
            Column::new("aluno_nome", "Aluno"),
            Column::new("turma_nome", "Turma"),
            Column::new("competencia", "Competencia"),
            Column::new("valor_total", "Total"),
            Column::new("status", "Status"),
        ])
        .section("Pagamento", &["aluno", "plano", "competencia", "valor", "valor_pago"])
        .section("Encargos", &["desconto", "multa", "juros", "dias_atraso", "valor_total"])
        .section("Datas", &["data_vencimento", "data_pagamento", "forma_pagamento", "status"])
        .section("Observacoes", &["observacoes"])
        .filters(&["status", "forma_pagamento"])
}

fn pagamentos_professores() -> ResourceConfig {
    ResourceConfig::new(
        "pagamentos-professores",
        "Pagamentos de professores",
        "/pagamentos-professores",
    )
    .singular("Pagamento professor")
    .description("Registre competencias e valores da equipe docente.")
    .fields(vec![
        ResourceField::lookup(
            "professor",
            "Professor",
            ResourceRef::new("/professores", "nome_completo"),
        )
        .required(),
        ResourceField::date("competencia", "Competencia").required(),
        ResourceField::currency("valor_bruto", "Valor bruto").required(),
        ResourceField::currency("descontos", "Descontos")
            .required()
            .default_value(json!(0)),
        ResourceField::currency("valor_liquido", "Valor liquido")
            .read_only()
            .helper("Calculado automaticamente quando vazio."),
        ResourceField::date("data_pagamento", "Data pagamento"),
        ResourceField::choice("status", "Status", STATUS_PAGAMENTO_PROFESSOR)
            .default_value(json!("PENDENTE")),
    ])
    .columns(vec![
        Column::new("professor_nome", "Professor"),
        Column::new("competencia", "Competencia"),
        Column::new("valor_bruto", "Valor bruto"),
        Column::new("valor_liquido", "Valor liquido"),
        Column::new("status", "Status"),
    ])
    .section(
        "Pagamento",
        &["professor", "competencia", "valor_bruto", "descontos", "valor_liquido"],
    )
    .section("Status", &["data_pagamento", "status"])
    .filters(&["status"])
}

fn despesas() -> ResourceConfig {
    ResourceConfig::new("despesas", "Despesas", "/despesas")
        .singular("Despesa")
        .description("Acompanhe custos fixos e variaveis.")
        .fields(vec![
            ResourceField::text("descricao", "Descricao").required(),
            ResourceField::choice("categoria", "Categoria", DESPESA_CATEGORIA).required(),
            ResourceField::currency("valor", "Valor").required(),
            ResourceField::date("data", "Data").required(),
            ResourceField::choice("tipo", "Tipo", DESPESA_TIPO).required(),
            ResourceField::textarea("observacoes", "Observacoes"),
        ])
        .columns(vec![
            Column::new("descricao", "Descricao"),
            Column::new("categoria", "Categoria"),
            Column::new("valor", "Valor"),
            Column::new("data", "Data"),
            Column::new("tipo", "Tipo"),
        ])
        .section("Despesa", &["descricao", "categoria", "valor", "data", "tipo"])
        .section("Observacoes", &["observacoes"])
        .filters(&["categoria", "tipo"])
}

fn templates() -> ResourceConfig {
    ResourceConfig::new("templates", "Templates de contrato", "/templates-contrato")
        .path("/templates-contrato")
        .singular("Template de contrato")
        .description("Padronize textos e estilos para contratos escolares.")
        .fields(vec![
            ResourceField::text("nome", "Nome").required(),
            ResourceField::text("versao", "Versao").required(),
            ResourceField::textarea("corpo_html", "Corpo HTML").required(),
            ResourceField::textarea("css", "CSS"),
            ResourceField::boolean("ativo", "Ativo").default_value(json!(true)),
        ])
        .columns(vec![
            Column::new("nome", "Template"),
            Column::new("versao", "Versao"),
            Column::new("ativo", "Ativo"),
            Column::new("updated_at", "Atualizado"),
        ])
        .section("Template", &["nome", "versao", "ativo"])
        .section("Conteudo", &["corpo_html", "css"])
        .filters(&["ativo"])
}

fn contratos() -> ResourceConfig {
    ResourceConfig::new("contratos", "Contratos", "/contratos")
        .singular("Contrato")
        .description("Emissao e acompanhamento de contratos escolares.")
        .fields(vec![
            ResourceField::text("numero", "Numero").read_only(),
            ResourceField::lookup(
                "escola",
                "Escola",
                ResourceRef::new("/escolas", "nome_fantasia"),
            )
            .required(),
            ResourceField::lookup(
                "aluno",
                "Aluno",
                ResourceRef::new("/alunos", "nome_completo"),
            )
            .required(),
            ResourceField::lookup(
                "responsavel",
                "Responsavel",
                ResourceRef::new("/responsaveis", "nome_completo"),
            )
            .required(),
            ResourceField::lookup("turma", "Turma", ResourceRef::new("/turmas", "nome")).required(),
            ResourceField::lookup(
                "plano",
                "Plano educacional",
                ResourceRef::new("/planos", "nome"),
            )
            .required(),
            ResourceField::lookup(
                "template",
                "Template",
                ResourceRef::new("/templates-contrato", "nome"),
            )
            .required(),
            ResourceField::date("data_emissao", "Data emissao").required(),
            ResourceField::text("cidade_assinatura", "Cidade assinatura").required(),
            ResourceField::choice("status", "Status", STATUS_CONTRATO)
                .default_value(json!("RASCUNHO")),
        ])
        .columns(vec![
            Column::new("numero", "Contrato"),
            Column::new("aluno_nome", "Aluno"),
            Column::new("escola_nome", "Escola"),
            Column::new("status", "Status"),
            Column::new("data_emissao", "Emissao"),
        ])
        .section("Identificacao", &["numero", "status", "data_emissao", "cidade_assinatura"])
        .section(
            "Relacionamentos",
            &["escola", "aluno", "responsavel", "turma", "plano", "template"],
        )
        .filters(&["status", "escola"])
        .action(ResourceAction {
            key: "gerar_pdf".into(),
            label: "Gerar PDF".into(),
            enabled_when: Some(Condition::FieldEquals {
                field: "status".into(),
                value: json!("RASCUNHO"),
            }),
        })
        .lock_when(Condition::FieldNotEquals {
            field: "status".into(),
            value: json!("RASCUNHO"),
        })
}

fn assinaturas() -> ResourceConfig {
    ResourceConfig::new("assinaturas", "Assinaturas", "/assinaturas")
        .singular("Assinatura")
        .description("Registre assinaturas e aceite digital.")
        .fields(vec![
            ResourceField::lookup(
                "contrato",
                "Contrato",
                ResourceRef::new("/contratos", "numero"),
            )
            .required(),
            ResourceField::choice("tipo", "Tipo", TIPO_ASSINATURA).required(),
            ResourceField::text("nome", "Nome").required(),
            ResourceField::text("cpf", "CPF").required(),
            ResourceField::date("data_assinatura", "Data assinatura"),
        ])
        .columns(vec![
            Column::new("contrato_numero", "Contrato"),
            Column::new("tipo", "Tipo"),
            Column::new("nome", "Nome"),
            Column::new("data_assinatura", "Data"),
        ])
        .section("Assinatura", &["contrato", "tipo", "nome", "cpf", "data_assinatura"])
        .filters(&["tipo"])
}

fn permissoes() -> ResourceConfig {
    ResourceConfig::new("permissoes", "Permissoes", "/permissoes")
        .singular("Permissao")
        .description("Visualize permissoes cadastradas no sistema.")
        .read_only()
        .fields(vec![
            ResourceField::text("name", "Nome").read_only(),
            ResourceField::text("codename", "Codename").read_only(),
            ResourceField::number("content_type", "Content type").read_only(),
        ])
        .columns(vec![
            Column::new("name", "Permissao"),
            Column::new("codename", "Codigo"),
            Column::new("content_type", "Content type"),
        ])
        .section("Permissao", &["name", "codename", "content_type"])
}

fn grupos() -> ResourceConfig {
    ResourceConfig::new("grupos", "Grupos", "/grupos")
        .singular("Grupo")
        .description("Organize grupos e niveis de acesso.")
        .fields(vec![
            ResourceField::text("name", "Nome").required(),
            ResourceField::lookup(
                "permissions",
                "Permissoes",
                ResourceRef::new("/permissoes", "name"),
            )
            .multiple(),
        ])
        .columns(vec![
            Column::new("name", "Grupo"),
            Column::count("permissions", "Permissoes"),
        ])
        .section("Grupo", &["name"])
        .section("Permissoes", &["permissions"])
}

fn usuarios() -> ResourceConfig {
    ResourceConfig::new("usuarios", "Usuarios", "/usuarios")
        .singular("Usuario")
        .description("Controle acessos e perfis administrativos.")
        .fields(vec![
            ResourceField::text("username", "Usuario").required(),
            ResourceField::text("first_name", "Nome"),
            ResourceField::text("last_name", "Sobrenome"),
            ResourceField::email("email", "Email"),
            ResourceField::boolean("is_active", "Ativo").default_value(json!(true)),
            ResourceField::boolean("is_staff", "Staff"),
            ResourceField::boolean("is_superuser", "Superuser"),
            ResourceField::lookup("groups", "Grupos", ResourceRef::new("/grupos", "name"))
                .multiple(),
            ResourceField::lookup(
                "user_permissions",
                "Permissoes diretas",
                ResourceRef::new("/permissoes", "name"),
            )
            .multiple(),
            ResourceField::password("password", "Senha")
                .helper("Preencha apenas para criar ou atualizar senha."),
        ])
        .columns(vec![
            Column::new("username", "Usuario"),
            Column::new("email", "Email"),
            Column::new("is_active", "Ativo"),
            Column::new("is_staff", "Staff"),
            Column::new("is_superuser", "Superuser"),
        ])
        .section("Credenciais", &["username", "password"])
        .section("Dados pessoais", &["first_name", "last_name", "email"])
        .section("Acesso", &["is_active", "is_staff", "is_superuser"])
        .section("Permissoes", &["groups", "user_permissions"])
        .filters(&["is_active", "is_staff", "is_superuser"])
}

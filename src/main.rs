#![no_std]
#![no_main]
#![warn(clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions, clippy::wildcard_imports)]

mod adc;
mod background;
mod board;
mod command;
mod control;
mod heater;
mod transport;

use defmt_rtt as _;
use panic_probe as _;

#[rtic::app(device = stm32f0xx_hal::pac, dispatchers = [USART1, TIM14])]
mod app {
    use defmt::*;
    use embedded_hal::PwmPin;
    use heater_core::{
        config::{ControlConfig, FIRMWARE_VERSION},
        control::ControlLoop,
        heater::HeaterActuator,
        sensors::{ChannelMask, SensorBank},
    };
    use rtic_monotonics::{
        stm32::{Tim2 as Mono, *},
        Monotonic,
    };
    use rtic_sync::{
        channel::{Receiver, Sender},
        make_channel,
    };
    use stm32f0xx_hal::{
        gpio::{Output, Pin, PushPull},
        prelude::*,
        pwm,
    };

    use crate::{
        adc::Sampler,
        board::{self, HeaterCompare},
        heater::BoardHeater,
        transport::I2cTarget,
    };

    #[shared]
    struct Shared {
        sensors: SensorBank,
        config: ControlConfig,
        heater: BoardHeater,
        compare: HeaterCompare,
        skip: ChannelMask,
    }

    #[local]
    struct Local {
        sampler: Sampler,
        wake: Sender<'static, (), 1>,
        control: ControlLoop,
        indicator: Pin<Output<PushPull>>,
        target: I2cTarget,
        actuator: HeaterActuator,
    }

    #[init]
    fn init(mut cx: init::Context) -> (Shared, Local) {
        // Set system clock to 24 MHz
        let mut rcc = cx
            .device
            .RCC
            .configure()
            .hsi48()
            .sysclk(24.mhz())
            .pclk(24.mhz())
            .hclk(24.mhz())
            .freeze(&mut cx.device.FLASH);

        trace!("sysclk: {}", rcc.clocks.sysclk().0);
        trace!("hclk: {}", rcc.clocks.hclk().0);
        trace!("pclk: {}", rcc.clocks.pclk().0);

        // Enable tim2 monotonic
        let token = rtic_monotonics::create_stm32_tim2_monotonic_token!();
        Mono::start(board::SYSCLK.raw(), token);

        // Setup GPIO
        let gpioa = cx.device.GPIOA.split(&mut rcc);
        let gpiob = cx.device.GPIOB.split(&mut rcc);

        let mut indicator = gpiob.pb3.into_push_pull_output(&cx.cs).downgrade();
        unwrap!(indicator.set_low());

        // Setup sensor inputs & ADC
        let pins = (
            gpioa.pa0.into_analog(&cx.cs),
            gpioa.pa1.into_analog(&cx.cs),
            gpioa.pa2.into_analog(&cx.cs),
            gpioa.pa3.into_analog(&cx.cs),
            gpioa.pa4.into_analog(&cx.cs),
            gpioa.pa5.into_analog(&cx.cs),
            gpioa.pa6.into_analog(&cx.cs),
            gpioa.pa7.into_analog(&cx.cs),
        );
        let sampler = Sampler::new(cx.device.ADC, pins);

        // Setup heater output & control timer
        let mut compare = pwm::tim1(
            cx.device.TIM1,
            gpioa.pa8.into_alternate_af2(&cx.cs),
            &mut rcc,
            board::CONTROL_RATE.raw().hz(),
        );
        compare.set_duty(0);
        compare.enable();
        let heater = BoardHeater::new();
        board::configure_control_timer();

        // Setup I2C target
        let _scl = gpiob
            .pb6
            .into_alternate_af1(&cx.cs)
            .internal_pull_up(&cx.cs, true)
            .set_open_drain(&cx.cs);
        let _sda = gpiob
            .pb7
            .into_alternate_af1(&cx.cs)
            .internal_pull_up(&cx.cs, true)
            .set_open_drain(&cx.cs);
        let target = I2cTarget::new(cx.device.I2C1);

        // Setup channels
        let (wake, rx) = make_channel!((), 1);

        // Launch background task
        unwrap!(background::spawn(rx).ok());

        info!(
            "Heater board v{=u16} at I2C address {=u8:#x}",
            FIRMWARE_VERSION,
            board::I2C_ADDRESS
        );

        (
            Shared {
                sensors: SensorBank::new(),
                config: ControlConfig::new(),
                heater,
                compare,
                skip: ChannelMask::NONE,
            },
            Local {
                sampler,
                wake,
                control: ControlLoop::new(),
                indicator,
                target,
                actuator: HeaterActuator::new(),
            },
        )
    }

    #[idle]
    fn idle(_: idle::Context) -> ! {
        loop {
            cortex_m::asm::wfi();
        }
    }

    #[task(binds = ADC_COMP, priority = 4, local = [sampler, wake], shared = [sensors, skip])]
    fn adc_comp(cx: adc_comp::Context) {
        crate::adc::conversion_complete(cx);
    }

    #[task(
        binds = TIM1_BRK_UP_TRG_COM,
        priority = 3,
        local = [control, indicator],
        shared = [config, sensors, heater, compare]
    )]
    fn tim1_update(cx: tim1_update::Context) {
        crate::control::control_tick(cx);
    }

    #[task(binds = I2C1, priority = 2, local = [target], shared = [config, sensors, heater, compare])]
    fn i2c1(cx: i2c1::Context) {
        crate::command::i2c_event(cx);
    }

    #[task(priority = 1, local = [actuator], shared = [config, heater, skip])]
    async fn background(cx: background::Context, wake: Receiver<'static, (), 1>) {
        crate::background::background(cx, wake).await;
    }

    timestamp!("{=u64:us}", {
        Mono::now().duration_since_epoch().to_micros()
    });
}
